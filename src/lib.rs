//! Colony Mind - per-agent priority task scheduling for colony simulations

pub mod core;
pub mod detectors;
pub mod entity;
pub mod handlers;
pub mod sandbox;
pub mod simulation;
pub mod spatial;
pub mod systems;
pub mod tasks;
pub mod world;
