//! Task orchestrator - drives every agent through the decision pipeline
//!
//! Per agent, per cycle:
//! rate limit -> context -> detectors -> enqueue -> expiry sweep ->
//! preemption -> promotion -> handler -> outcome
//!
//! External systems may call [`TaskOrchestrator::emit_task`] at any time;
//! those tasks share the queue and its accumulation rule with detector
//! proposals. Agents are processed in fixed-size batches so a host can yield
//! between them.

use std::collections::VecDeque;

use ahash::{AHashMap, AHashSet};

use crate::core::error::{Result, SchedulerError};
use crate::core::types::{EntityId, Millis, TaskId};
use crate::core::SchedulerConfig;
use crate::detectors::DetectorSet;
use crate::entity::{AgentMemory, MemoryStore};
use crate::handlers::{HandlerContext, HandlerSet};
use crate::simulation::context_cache::ContextAssembler;
use crate::simulation::host::SimulationHost;
use crate::simulation::report::{
    AgentCycle, AgentReport, BatchProgress, CycleReport, FinishedTask, SchedulerStats,
};
use crate::tasks::{EnqueueOutcome, Task, TaskIdGenerator, TaskQueue, TaskSpec, TaskStatus, TaskTarget};

pub struct TaskOrchestrator {
    config: SchedulerConfig,
    detectors: DetectorSet,
    handlers: HandlerSet,
    queue: TaskQueue,
    /// At most one per agent
    active: AHashMap<EntityId, Task>,
    memory: MemoryStore,
    contexts: ContextAssembler,
    last_run: AHashMap<EntityId, Millis>,
    /// Registration order, the order agents are processed in
    roster: Vec<EntityId>,
    tracked: AHashSet<EntityId>,
    /// Next roster index of the current pass
    cursor: usize,
    ids: TaskIdGenerator,
    stats: SchedulerStats,
    history: VecDeque<FinishedTask>,
}

impl TaskOrchestrator {
    /// Orchestrator with the standard detectors and handlers
    pub fn new(config: SchedulerConfig) -> Result<Self> {
        config.validate()?;
        let detectors = DetectorSet::standard(&config);
        Ok(Self::with_parts(config, detectors, HandlerSet::standard()))
    }

    /// Composition root for custom detector and handler sets
    pub fn with_parts(config: SchedulerConfig, detectors: DetectorSet, handlers: HandlerSet) -> Self {
        Self {
            queue: TaskQueue::new(config.max_queue_len),
            contexts: ContextAssembler::new(config.context_ttl_ms, config.search_radius),
            history: VecDeque::with_capacity(config.history_len),
            config,
            detectors,
            handlers,
            active: AHashMap::new(),
            memory: MemoryStore::new(),
            last_run: AHashMap::new(),
            roster: Vec::new(),
            tracked: AHashSet::new(),
            cursor: 0,
            ids: TaskIdGenerator::new(),
            stats: SchedulerStats::default(),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Start tracking an agent; false if it was already tracked
    pub fn register_agent(&mut self, agent: EntityId) -> bool {
        if !self.tracked.insert(agent) {
            return false;
        }
        self.roster.push(agent);
        true
    }

    pub fn is_tracked(&self, agent: EntityId) -> bool {
        self.tracked.contains(&agent)
    }

    pub fn agents(&self) -> &[EntityId] {
        &self.roster
    }

    /// Enqueue an externally observed intent
    pub fn emit_task(&mut self, agent: EntityId, spec: TaskSpec, now: Millis) -> Result<EnqueueOutcome> {
        if !self.is_tracked(agent) {
            return Err(SchedulerError::UnknownAgent(agent));
        }
        Ok(self.enqueue_spec(agent, spec, now))
    }

    fn enqueue_spec(&mut self, agent: EntityId, spec: TaskSpec, now: Millis) -> EnqueueOutcome {
        let task = self.ids.stamp(agent, spec, now);
        let outcome = self.queue.enqueue(agent, task, self.config.accumulation_boost);
        match outcome {
            EnqueueOutcome::Inserted(_) => self.stats.created += 1,
            EnqueueOutcome::Accumulated { .. } => self.stats.accumulated += 1,
            EnqueueOutcome::Evicted { .. } => {
                self.stats.created += 1;
                self.stats.evicted += 1;
            }
            EnqueueOutcome::Rejected => self.stats.rejected += 1,
        }
        outcome
    }

    /// Run the full pipeline for one agent
    ///
    /// `dt` is the host's elapsed time since its previous update; rate
    /// limiting works from the host clock.
    pub fn update_agent<H: SimulationHost + ?Sized>(
        &mut self,
        host: &mut H,
        agent: EntityId,
        dt: Millis,
    ) -> Result<AgentCycle> {
        if !self.is_tracked(agent) {
            return Err(SchedulerError::UnknownAgent(agent));
        }

        let now = host.now();
        if let Some(&last) = self.last_run.get(&agent) {
            if now.saturating_sub(last) < self.config.update_interval_ms {
                self.stats.rate_limited += 1;
                return Ok(AgentCycle::RateLimited);
            }
        }

        // Read phase
        let registry = host.registry();
        let Some(ctx) = self
            .contexts
            .build(agent, now, &registry, self.memory.get(agent))
        else {
            self.stats.no_context += 1;
            tracing::trace!("No context for {}, cycle skipped", agent);
            return Ok(AgentCycle::NoContext);
        };
        self.last_run.insert(agent, now);

        let mut report = AgentReport {
            agent: Some(agent),
            dt,
            ..Default::default()
        };

        let proposals = self.detectors.run(&ctx);
        report.proposed = proposals.len();
        for spec in proposals {
            let outcome = self.enqueue_spec(agent, spec, now);
            if matches!(outcome, EnqueueOutcome::Inserted(_) | EnqueueOutcome::Evicted { .. }) {
                report.inserted += 1;
            }
        }

        report.expired = self.queue.clean_expired(agent, now);
        let next = match self.preempt(agent, now)? {
            Some((superseded, task)) => {
                report.preempted = Some(superseded);
                Some(task)
            }
            None if self.active.contains_key(&agent) => None,
            None => self.queue.dequeue(agent, now),
        };
        if let Some(mut task) = next {
            task.transition(TaskStatus::Active)?;
            tracing::debug!(
                "{} promoted {} ({} at {:.2})",
                agent,
                task.id(),
                task.kind(),
                task.priority()
            );
            report.promoted = Some(task.id());
            self.active.insert(agent, task);
        }

        let Some(task) = self.active.get(&agent) else {
            return Ok(AgentCycle::Ran(report));
        };
        let task_id = task.id();
        let target_position = task.target().and_then(|target| registry.resolve_target(target));
        let target_zone = match task.target() {
            Some(TaskTarget::Zone(zone)) => Some(*zone),
            _ => target_position
                .and_then(|pos| registry.metadata.and_then(|meta| meta.zone_at(pos))),
        };

        // Write phase: the handler gets the domain systems
        let memory = self.memory.get_or_create(agent);
        let mut handler_ctx = HandlerContext {
            agent,
            now,
            agent_position: ctx.position,
            target_position,
            target_zone,
            interaction_range: self.config.interaction_range,
            systems: host.systems(),
            memory,
        };
        let result = self.handlers.dispatch(task, &mut handler_ctx);
        drop(handler_ctx);

        self.stats.handler_invocations += 1;
        report.dispatched = Some(task_id);

        let resolution = match result {
            Ok(outcome) => outcome.resolution().map(|status| (status, outcome.message)),
            Err(err) => {
                self.stats.handler_errors += 1;
                tracing::warn!("{} {} cannot run: {}", agent, task_id, err);
                Some((TaskStatus::Failed, Some(err.to_string())))
            }
        };
        if let Some((status, reason)) = resolution {
            report.resolved = self.finish(agent, status, now, reason)?;
        }

        Ok(AgentCycle::Ran(report))
    }

    /// Cancel the active task when an urgent pending task outranks it
    ///
    /// Ranks compare proposed priorities, which accumulation never raises.
    /// Returns the superseded id and the pending task taken to replace it.
    fn preempt(&mut self, agent: EntityId, now: Millis) -> Result<Option<(TaskId, Task)>> {
        let Some(active) = self.active.get(&agent) else {
            return Ok(None);
        };
        let candidate = self
            .queue
            .pending(agent)
            .iter()
            .filter(|t| !t.is_expired(now))
            .filter(|t| self.config.preempt_kinds.contains(&t.kind()) && t.kind() != active.kind())
            .filter(|t| {
                t.proposed_priority() >= self.config.preempt_priority
                    && t.proposed_priority() > active.proposed_priority()
            })
            .max_by(|a, b| {
                a.proposed_priority()
                    .total_cmp(&b.proposed_priority())
                    .then(b.created_at().cmp(&a.created_at()))
                    .then(b.id().cmp(&a.id()))
            })
            .map(|t| (t.id(), t.kind(), t.proposed_priority()));
        let Some((best, kind, priority)) = candidate else {
            return Ok(None);
        };

        let superseded = active.id();
        tracing::debug!(
            "{} preempting {} ({}) for {} ({} at {:.2})",
            agent,
            superseded,
            active.kind(),
            best,
            kind,
            priority
        );
        self.stats.preempted += 1;
        self.finish(agent, TaskStatus::Cancelled, now, Some("superseded".into()))?;
        Ok(self.queue.take(agent, best).map(|task| (superseded, task)))
    }

    /// Move the active task to a terminal status and into history
    fn finish(
        &mut self,
        agent: EntityId,
        status: TaskStatus,
        now: Millis,
        reason: Option<String>,
    ) -> Result<Option<(TaskId, TaskStatus)>> {
        let Some(task) = self.active.get_mut(&agent) else {
            return Ok(None);
        };
        task.transition(status)?;
        let Some(task) = self.active.remove(&agent) else {
            return Ok(None);
        };

        match status {
            TaskStatus::Completed => self.stats.completed += 1,
            TaskStatus::Failed => self.stats.failed += 1,
            TaskStatus::Cancelled => self.stats.cancelled += 1,
            _ => {}
        }
        tracing::debug!(
            "{} {} ({}) -> {:?}{}",
            agent,
            task.id(),
            task.kind(),
            status,
            reason.as_deref().map(|r| format!(": {}", r)).unwrap_or_default()
        );

        let id = task.id();
        if self.config.history_len > 0 {
            while self.history.len() >= self.config.history_len {
                self.history.pop_front();
            }
            self.history.push_back(FinishedTask {
                task,
                finished_at: now,
                reason,
            });
        }
        Ok(Some((id, status)))
    }

    /// Cancel an agent's active task from outside (death, explicit order)
    pub fn cancel_active(&mut self, agent: EntityId, reason: &str, now: Millis) -> Result<Option<TaskId>> {
        if !self.is_tracked(agent) {
            return Err(SchedulerError::UnknownAgent(agent));
        }
        Ok(self
            .finish(agent, TaskStatus::Cancelled, now, Some(reason.to_string()))?
            .map(|(id, _)| id))
    }

    /// Process the next batch of the current pass
    pub fn step_batch<H: SimulationHost + ?Sized>(&mut self, host: &mut H, dt: Millis) -> Result<BatchProgress> {
        self.run_batch(host, dt, &mut CycleReport::default())
    }

    fn run_batch<H: SimulationHost + ?Sized>(
        &mut self,
        host: &mut H,
        dt: Millis,
        report: &mut CycleReport,
    ) -> Result<BatchProgress> {
        let start = self.cursor.min(self.roster.len());
        let end = (start + self.config.batch_size).min(self.roster.len());
        let batch = self.roster[start..end].to_vec();
        self.cursor = end;

        let mut progress = BatchProgress {
            processed: batch.len(),
            ..Default::default()
        };
        for agent in batch {
            let cycle = self.update_agent(host, agent, dt)?;
            if cycle.ran().is_some() {
                progress.ran += 1;
            }
            report.record(&cycle);
        }

        progress.remaining = self.roster.len().saturating_sub(self.cursor);
        if progress.remaining == 0 {
            progress.pass_complete = true;
            self.cursor = 0;
            self.stats.cycles += 1;
            self.stats.elapsed_ms += dt;
            self.contexts.prune(host.now());
        }
        Ok(progress)
    }

    /// Finish the current pass over all agents, batch by batch
    pub fn update<H: SimulationHost + ?Sized>(&mut self, host: &mut H, dt: Millis) -> Result<CycleReport> {
        let mut report = CycleReport::default();
        loop {
            let progress = self.run_batch(host, dt, &mut report)?;
            report.batches += 1;
            if progress.pass_complete {
                break;
            }
        }
        tracing::debug!(
            "Pass done: {} agents in {} batches, {} ran, {} completed, {} failed",
            report.processed,
            report.batches,
            report.ran,
            report.completed,
            report.failed
        );
        Ok(report)
    }

    /// Stop tracking an agent, dropping its queue, active task, memory and
    /// cached context. No finalization runs for the dropped tasks.
    pub fn clear_agent(&mut self, agent: EntityId) -> bool {
        if !self.tracked.remove(&agent) {
            return false;
        }
        if let Some(pos) = self.roster.iter().position(|a| *a == agent) {
            self.roster.remove(pos);
            if pos < self.cursor {
                self.cursor -= 1;
            }
        }

        let dropped = self.queue.clear(agent);
        let active = self.active.remove(&agent);
        self.memory.remove(agent);
        self.contexts.invalidate(agent);
        self.last_run.remove(&agent);

        tracing::debug!(
            "Cleared {}: {} pending dropped, active {}",
            agent,
            dropped,
            active.map(|t| t.id().to_string()).unwrap_or_else(|| "none".into())
        );
        true
    }

    pub fn active_task(&self, agent: EntityId) -> Option<&Task> {
        self.active.get(&agent)
    }

    /// Pending tasks in the order they would be dequeued
    pub fn pending_tasks(&self, agent: EntityId) -> Vec<&Task> {
        self.queue.ordered(agent)
    }

    pub fn memory(&self, agent: EntityId) -> Option<&AgentMemory> {
        self.memory.get(agent)
    }

    /// Finished tasks, oldest first
    pub fn recent_finished(&self) -> impl Iterator<Item = &FinishedTask> {
        self.history.iter()
    }

    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            agents: self.roster.len(),
            pending: self.queue.total_len(),
            active: self.active.len(),
            expired: self.queue.expired_total(),
            cache_hits: self.contexts.hits(),
            cache_misses: self.contexts.misses(),
            ..self.stats.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Vec2;
    use crate::entity::NeedsSnapshot;
    use crate::handlers::fakes::Fake;
    use crate::systems::{DomainResult, DomainSystems};
    use crate::tasks::{TaskKind, TaskSource};
    use crate::world::{NeedsSource, PositionSource, WorldRegistry};

    struct TestHost {
        now: Millis,
        positions: AHashMap<EntityId, Vec2>,
        movement: Fake,
        needs: Fake,
    }

    impl TestHost {
        fn new() -> Self {
            Self {
                now: 0,
                positions: AHashMap::new(),
                movement: Fake::replying(DomainResult::in_progress()),
                needs: Fake::replying(DomainResult::completed()),
            }
        }

        fn place(&mut self, agent: EntityId) {
            self.positions.insert(agent, Vec2::new(0.0, 0.0));
        }
    }

    impl PositionSource for TestHost {
        fn position(&self, entity: EntityId) -> Option<Vec2> {
            self.positions.get(&entity).copied()
        }
    }

    impl NeedsSource for TestHost {
        fn needs(&self, _agent: EntityId) -> Option<NeedsSnapshot> {
            None
        }
    }

    impl SimulationHost for TestHost {
        fn now(&self) -> Millis {
            self.now
        }

        fn registry(&self) -> WorldRegistry<'_> {
            WorldRegistry::new(self).with_needs(self)
        }

        fn systems(&mut self) -> DomainSystems<'_> {
            DomainSystems {
                movement: Some(&mut self.movement),
                needs: Some(&mut self.needs),
                ..Default::default()
            }
        }
    }

    fn agent(raw: u128) -> EntityId {
        EntityId::from_raw(raw)
    }

    /// No detectors, so only emitted tasks reach the queue
    fn quiet(config: SchedulerConfig) -> TaskOrchestrator {
        TaskOrchestrator::with_parts(config, DetectorSet::empty(), HandlerSet::standard())
    }

    fn spec(kind: TaskKind, priority: f32) -> TaskSpec {
        TaskSpec::new(kind, priority, TaskSource::external("test"))
    }

    fn setup() -> (TaskOrchestrator, TestHost, EntityId) {
        let mut orchestrator = quiet(SchedulerConfig::default());
        let mut host = TestHost::new();
        let a = agent(1);
        orchestrator.register_agent(a);
        host.place(a);
        (orchestrator, host, a)
    }

    #[test]
    fn test_untracked_agents_are_rejected() {
        let mut orchestrator = quiet(SchedulerConfig::default());
        let mut host = TestHost::new();

        assert!(matches!(
            orchestrator.emit_task(agent(9), spec(TaskKind::Rest, 0.5), 0),
            Err(SchedulerError::UnknownAgent(_))
        ));
        assert!(matches!(
            orchestrator.update_agent(&mut host, agent(9), 0),
            Err(SchedulerError::UnknownAgent(_))
        ));
    }

    #[test]
    fn test_rate_limit() {
        let (mut orchestrator, mut host, a) = setup();

        assert!(orchestrator.update_agent(&mut host, a, 0).unwrap().ran().is_some());
        host.now = 249;
        assert_eq!(
            orchestrator.update_agent(&mut host, a, 249).unwrap(),
            AgentCycle::RateLimited
        );
        host.now = 250;
        assert!(orchestrator.update_agent(&mut host, a, 1).unwrap().ran().is_some());
        assert_eq!(orchestrator.stats().rate_limited, 1);
    }

    #[test]
    fn test_missing_position_skips_cycle() {
        let mut orchestrator = quiet(SchedulerConfig::default());
        let mut host = TestHost::new();
        let a = agent(1);
        orchestrator.register_agent(a);
        orchestrator.emit_task(a, spec(TaskKind::Rest, 0.5), 0).unwrap();

        assert_eq!(
            orchestrator.update_agent(&mut host, a, 0).unwrap(),
            AgentCycle::NoContext
        );
        assert!(orchestrator.active_task(a).is_none());
        assert_eq!(orchestrator.pending_tasks(a).len(), 1);
        assert!(host.needs.calls.is_empty());
    }

    #[test]
    fn test_emitted_task_runs_to_completion() {
        let (mut orchestrator, mut host, a) = setup();
        orchestrator.emit_task(a, spec(TaskKind::Rest, 0.5), 0).unwrap();

        let cycle = orchestrator.update_agent(&mut host, a, 0).unwrap();
        let report = cycle.ran().unwrap();
        assert!(report.promoted.is_some());
        assert_eq!(report.dispatched, report.promoted);
        assert_eq!(
            report.resolved,
            Some((report.promoted.unwrap(), TaskStatus::Completed))
        );

        assert!(orchestrator.active_task(a).is_none());
        assert_eq!(host.needs.calls, vec!["rest".to_string()]);
        let finished: Vec<_> = orchestrator.recent_finished().collect();
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].task.status(), TaskStatus::Completed);

        let stats = orchestrator.stats();
        assert_eq!(stats.created, 1);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.handler_invocations, 1);
    }

    #[test]
    fn test_in_progress_task_stays_single_active() {
        let (mut orchestrator, mut host, a) = setup();
        host.needs.reply = DomainResult::in_progress();
        orchestrator.emit_task(a, spec(TaskKind::Rest, 0.5), 0).unwrap();
        orchestrator.emit_task(a, spec(TaskKind::Idle, 0.3), 0).unwrap();

        for step in 0..4 {
            host.now = step * 250;
            orchestrator.update_agent(&mut host, a, 250).unwrap();
            assert_eq!(orchestrator.active_task(a).map(|t| t.kind()), Some(TaskKind::Rest));
            assert_eq!(orchestrator.active_task(a).map(|t| t.status()), Some(TaskStatus::Active));
        }
        assert_eq!(host.needs.calls.len(), 4);
        assert_eq!(orchestrator.pending_tasks(a).len(), 1);
    }

    #[test]
    fn test_handler_error_fails_without_retry() {
        let (mut orchestrator, mut host, a) = setup();
        // No need parameter
        orchestrator.emit_task(a, spec(TaskKind::SatisfyNeed, 0.9), 0).unwrap();

        let report = orchestrator.update_agent(&mut host, a, 0).unwrap();
        let (id, status) = report.ran().unwrap().resolved.unwrap();
        assert_eq!(status, TaskStatus::Failed);

        host.now = 1_000;
        let report = orchestrator.update_agent(&mut host, a, 1_000).unwrap();
        assert_eq!(report.ran().unwrap().dispatched, None);

        let finished: Vec<_> = orchestrator.recent_finished().collect();
        assert_eq!(finished[0].task.id(), id);
        assert!(finished[0].reason.as_deref().unwrap().contains("need"));
        assert_eq!(orchestrator.stats().handler_errors, 1);
        assert_eq!(orchestrator.stats().failed, 1);
    }

    #[test]
    fn test_expired_task_never_promoted() {
        let (mut orchestrator, mut host, a) = setup();
        orchestrator
            .emit_task(a, spec(TaskKind::Rest, 0.5).with_ttl(100), 0)
            .unwrap();

        host.now = 100;
        let report = orchestrator.update_agent(&mut host, a, 100).unwrap();
        let report = report.ran().unwrap();
        assert_eq!(report.expired, 1);
        assert_eq!(report.promoted, None);
        assert!(host.needs.calls.is_empty());
        assert_eq!(orchestrator.stats().expired, 1);
    }

    #[test]
    fn test_flee_preempts_lower_active_task() {
        let (mut orchestrator, mut host, a) = setup();
        host.needs.reply = DomainResult::in_progress();
        orchestrator.emit_task(a, spec(TaskKind::Rest, 0.5), 0).unwrap();
        orchestrator.update_agent(&mut host, a, 0).unwrap();
        let rest = orchestrator.active_task(a).map(|t| t.id()).unwrap();

        // Urgent but not a preempting kind
        orchestrator.emit_task(a, spec(TaskKind::Gather, 0.96), 250).unwrap();
        host.now = 250;
        let report = orchestrator.update_agent(&mut host, a, 250).unwrap();
        assert_eq!(report.ran().unwrap().preempted, None);

        orchestrator
            .emit_task(
                a,
                spec(TaskKind::Flee, 1.0).with_position(Vec2::new(-20.0, 0.0)),
                500,
            )
            .unwrap();
        host.now = 500;
        let report = orchestrator.update_agent(&mut host, a, 250).unwrap();
        let report = report.ran().unwrap();
        assert_eq!(report.preempted, Some(rest));
        assert_eq!(orchestrator.active_task(a).map(|t| t.kind()), Some(TaskKind::Flee));
        assert_eq!(host.movement.calls, vec!["flee -20 0".to_string()]);

        let cancelled = orchestrator
            .recent_finished()
            .find(|f| f.task.id() == rest)
            .unwrap();
        assert_eq!(cancelled.task.status(), TaskStatus::Cancelled);
        assert_eq!(cancelled.reason.as_deref(), Some("superseded"));
        assert_eq!(orchestrator.stats().preempted, 1);
    }

    #[test]
    fn test_flee_preempts_saturated_active_task() {
        let (mut orchestrator, mut host, a) = setup();
        host.needs.reply = DomainResult::in_progress();
        for _ in 0..7 {
            orchestrator.emit_task(a, spec(TaskKind::Rest, 0.4), 0).unwrap();
        }
        orchestrator.update_agent(&mut host, a, 0).unwrap();
        let rest = orchestrator.active_task(a).unwrap();
        assert_eq!(rest.kind(), TaskKind::Rest);
        assert_eq!(rest.priority(), 1.0);
        let rest = rest.id();

        // A saturated chore waiting in the queue must not jump ahead of the flee
        for _ in 0..7 {
            orchestrator.emit_task(a, spec(TaskKind::Gather, 0.4), 0).unwrap();
        }
        orchestrator
            .emit_task(
                a,
                spec(TaskKind::Flee, 0.95).with_position(Vec2::new(0.0, 15.0)),
                250,
            )
            .unwrap();
        host.now = 250;
        let report = orchestrator.update_agent(&mut host, a, 250).unwrap();
        let report = report.ran().unwrap();

        assert_eq!(report.preempted, Some(rest));
        assert_eq!(orchestrator.active_task(a).map(|t| t.kind()), Some(TaskKind::Flee));
        assert_eq!(report.dispatched, report.promoted);
        assert_eq!(host.movement.calls, vec!["flee 0 15".to_string()]);
        assert_eq!(
            orchestrator.pending_tasks(a).iter().map(|t| t.kind()).collect::<Vec<_>>(),
            vec![TaskKind::Gather]
        );
        assert_eq!(orchestrator.stats().preempted, 1);
    }

    #[test]
    fn test_accumulated_flee_does_not_preempt_higher_proposal() {
        let (mut orchestrator, mut host, a) = setup();
        host.needs.reply = DomainResult::in_progress();
        orchestrator.emit_task(a, spec(TaskKind::Rest, 0.97), 0).unwrap();
        orchestrator.update_agent(&mut host, a, 0).unwrap();

        // Boosted to 1.0, but proposed below the active task
        for _ in 0..3 {
            orchestrator.emit_task(a, spec(TaskKind::Flee, 0.95), 250).unwrap();
        }
        host.now = 250;
        let report = orchestrator.update_agent(&mut host, a, 250).unwrap();

        assert_eq!(report.ran().unwrap().preempted, None);
        assert_eq!(orchestrator.active_task(a).map(|t| t.kind()), Some(TaskKind::Rest));
    }

    #[test]
    fn test_cancel_active() {
        let (mut orchestrator, mut host, a) = setup();
        host.needs.reply = DomainResult::in_progress();
        orchestrator.emit_task(a, spec(TaskKind::Rest, 0.5), 0).unwrap();
        orchestrator.update_agent(&mut host, a, 0).unwrap();

        let cancelled = orchestrator.cancel_active(a, "agent died", 10).unwrap();
        assert!(cancelled.is_some());
        assert!(orchestrator.active_task(a).is_none());
        assert_eq!(orchestrator.cancel_active(a, "again", 20).unwrap(), None);
        assert_eq!(orchestrator.stats().cancelled, 1);
    }

    #[test]
    fn test_clear_agent_drops_everything() {
        let (mut orchestrator, mut host, a) = setup();
        host.needs.reply = DomainResult::in_progress();
        orchestrator.emit_task(a, spec(TaskKind::Rest, 0.5), 0).unwrap();
        orchestrator.emit_task(a, spec(TaskKind::Idle, 0.1), 0).unwrap();
        orchestrator.update_agent(&mut host, a, 0).unwrap();
        assert!(orchestrator.memory(a).is_some());

        assert!(orchestrator.clear_agent(a));
        assert!(orchestrator.active_task(a).is_none());
        assert!(orchestrator.pending_tasks(a).is_empty());
        assert!(orchestrator.memory(a).is_none());
        assert!(!orchestrator.clear_agent(a));

        host.now = 1_000;
        orchestrator.update(&mut host, 1_000).unwrap();
        assert_eq!(host.needs.calls.len(), 1);
    }

    #[test]
    fn test_batches_and_cursor_after_removal() {
        let config = SchedulerConfig {
            batch_size: 2,
            ..SchedulerConfig::default()
        };
        let mut orchestrator = quiet(config);
        let mut host = TestHost::new();
        let agents: Vec<EntityId> = (1..=5).map(agent).collect();
        for a in &agents {
            orchestrator.register_agent(*a);
            host.place(*a);
        }

        let first = orchestrator.step_batch(&mut host, 0).unwrap();
        assert_eq!(first.processed, 2);
        assert_eq!(first.remaining, 3);
        assert!(!first.pass_complete);

        // Removing an already processed agent must not skip anyone
        orchestrator.clear_agent(agents[0]);
        let second = orchestrator.step_batch(&mut host, 0).unwrap();
        assert_eq!(second.processed, 2);
        assert!(orchestrator.last_run.contains_key(&agents[2]));
        assert!(orchestrator.last_run.contains_key(&agents[3]));

        let third = orchestrator.step_batch(&mut host, 0).unwrap();
        assert_eq!(third.processed, 1);
        assert!(third.pass_complete);
        assert!(orchestrator.last_run.contains_key(&agents[4]));
        assert_eq!(orchestrator.stats().cycles, 1);
    }

    #[test]
    fn test_update_runs_whole_pass() {
        let config = SchedulerConfig {
            batch_size: 3,
            ..SchedulerConfig::default()
        };
        let mut orchestrator = quiet(config);
        let mut host = TestHost::new();
        for raw in 1..=7 {
            orchestrator.register_agent(agent(raw));
            host.place(agent(raw));
        }

        let report = orchestrator.update(&mut host, 250).unwrap();
        assert_eq!(report.batches, 3);
        assert_eq!(report.processed, 7);
        assert_eq!(report.ran, 7);

        let report = orchestrator.update(&mut host, 250).unwrap();
        assert_eq!(report.rate_limited, 7);
        assert_eq!(orchestrator.stats().elapsed_ms, 500);
    }

    #[test]
    fn test_history_is_bounded() {
        let config = SchedulerConfig {
            history_len: 2,
            ..SchedulerConfig::default()
        };
        let mut orchestrator = quiet(config);
        let mut host = TestHost::new();
        let a = agent(1);
        orchestrator.register_agent(a);
        host.place(a);

        for step in 0..4u64 {
            host.now = step * 250;
            orchestrator.emit_task(a, spec(TaskKind::Idle, 0.2), host.now).unwrap();
            orchestrator.update_agent(&mut host, a, 250).unwrap();
        }
        assert_eq!(orchestrator.recent_finished().count(), 2);
        assert_eq!(orchestrator.stats().completed, 4);
    }

    #[test]
    fn test_standard_detectors_feed_queue() {
        let mut orchestrator = TaskOrchestrator::new(SchedulerConfig::default()).unwrap();
        let mut host = TestHost::new();
        let a = agent(1);
        orchestrator.register_agent(a);
        host.place(a);

        let report = orchestrator.update_agent(&mut host, a, 0).unwrap();
        let report = report.ran().unwrap();
        // Nothing but curiosity around an empty world
        assert_eq!(report.proposed, 1);
        assert_eq!(orchestrator.active_task(a).map(|t| t.kind()), Some(TaskKind::Explore));
        assert_eq!(host.movement.calls.len(), 1);
    }
}
