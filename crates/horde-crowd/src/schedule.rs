//! Schedule validation and read routing.
//!
//! [`validate_schedule`] runs once when the engine is built. It checks the
//! pass list for structural errors and records, for every read, which
//! earlier stage produced the value. That record is the happens-before
//! relation of the tick: stage `i` only starts after every stage it reads
//! from has finished.

use std::error::Error;
use std::fmt;

use horde_core::{Resource, ResourceSet};
use indexmap::IndexMap;

use crate::pass::CrowdPass;

// ── Read routing ───────────────────────────────────────────────────

/// Where a pass reads a resource from during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadSource {
    /// Provided by the engine before the first stage runs.
    Input,
    /// Produced by an earlier pass in the same tick.
    Stage {
        /// Index of the writing pass in the schedule.
        writer_index: usize,
    },
}

/// Per-pass routing table mapping each read [`Resource`] to its
/// [`ReadSource`].
#[derive(Debug)]
#[must_use]
pub struct SchedulePlan {
    routes: Vec<IndexMap<Resource, ReadSource>>,
}

impl SchedulePlan {
    /// Number of passes in the plan.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether the plan covers zero passes.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Read source for `resource` in pass `pass_index`.
    pub fn source(&self, pass_index: usize, resource: Resource) -> Option<ReadSource> {
        self.routes.get(pass_index)?.get(&resource).copied()
    }

    /// All `(resource, source)` pairs for a pass.
    pub fn routes_for(&self, pass_index: usize) -> Option<&IndexMap<Resource, ReadSource>> {
        self.routes.get(pass_index)
    }

    /// Indices of the passes `pass_index` must wait for.
    pub fn dependencies(&self, pass_index: usize) -> Vec<usize> {
        let mut deps: Vec<usize> = self
            .routes
            .get(pass_index)
            .into_iter()
            .flat_map(|r| r.values())
            .filter_map(|s| match s {
                ReadSource::Stage { writer_index } => Some(*writer_index),
                ReadSource::Input => None,
            })
            .collect();
        deps.sort_unstable();
        deps.dedup();
        deps
    }
}

// ── Errors ─────────────────────────────────────────────────────────

/// Two passes writing the same derived field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteConflict {
    /// The contested resource.
    pub resource: Resource,
    /// Name of the earlier writer.
    pub first_writer: String,
    /// Name of the later writer.
    pub second_writer: String,
}

/// Errors from schedule validation (startup-time, not per-tick).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// No passes registered.
    EmptySchedule,
    /// A pass reads a resource nobody provides before it runs.
    UnsatisfiedRead {
        /// Which pass.
        pass: String,
        /// The resource it reads.
        resource: Resource,
    },
    /// A pass writes a snapshot only the engine may publish.
    ReadOnlyInput {
        /// Which pass.
        pass: String,
        /// The engine-owned resource.
        resource: Resource,
    },
    /// Two or more passes write the same derived field.
    WriteConflict(Vec<WriteConflict>),
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptySchedule => write!(f, "schedule has no passes"),
            Self::UnsatisfiedRead { pass, resource } => write!(
                f,
                "pass '{pass}' reads {resource}, which no input or earlier pass provides"
            ),
            Self::ReadOnlyInput { pass, resource } => {
                write!(f, "pass '{pass}' writes engine-owned {resource}")
            }
            Self::WriteConflict(conflicts) => {
                write!(f, "write-write conflicts: ")?;
                for (i, c) in conflicts.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(
                        f,
                        "{} written by '{}' and '{}'",
                        c.resource, c.first_writer, c.second_writer
                    )?;
                }
                Ok(())
            }
        }
    }
}

impl Error for ScheduleError {}

// ── Validation ─────────────────────────────────────────────────────

/// Validate a pass list against the resources the engine provides.
///
/// Checks performed:
///
/// 1. The schedule is non-empty.
/// 2. No pass writes an engine-owned snapshot (an input that is not
///    agent state).
/// 3. Derived fields have at most one writer. Agent state is rewritten by
///    several passes in sequence and is exempt.
/// 4. Every read is an input or was written by an earlier pass.
pub fn validate_schedule(
    passes: &[Box<dyn CrowdPass>],
    inputs: ResourceSet,
) -> Result<SchedulePlan, ScheduleError> {
    if passes.is_empty() {
        return Err(ScheduleError::EmptySchedule);
    }

    for pass in passes {
        if let Some(resource) = pass
            .writes()
            .iter()
            .find(|r| inputs.contains(*r) && !r.is_agent_state())
        {
            return Err(ScheduleError::ReadOnlyInput {
                pass: pass.name().to_string(),
                resource,
            });
        }
    }

    {
        let mut last_writer: IndexMap<Resource, usize> = IndexMap::new();
        let mut conflicts = Vec::new();
        for (i, pass) in passes.iter().enumerate() {
            for resource in pass.writes().iter() {
                if resource.is_agent_state() {
                    continue;
                }
                if let Some(&j) = last_writer.get(&resource) {
                    conflicts.push(WriteConflict {
                        resource,
                        first_writer: passes[j].name().to_string(),
                        second_writer: pass.name().to_string(),
                    });
                }
                last_writer.insert(resource, i);
            }
        }
        if !conflicts.is_empty() {
            return Err(ScheduleError::WriteConflict(conflicts));
        }
    }

    let mut last_writer: IndexMap<Resource, usize> = IndexMap::new();
    let mut routes = Vec::with_capacity(passes.len());
    for (i, pass) in passes.iter().enumerate() {
        let mut pass_routes = IndexMap::new();
        for resource in pass.reads().iter() {
            let source = match last_writer.get(&resource) {
                Some(&j) => ReadSource::Stage { writer_index: j },
                None if inputs.contains(resource) => ReadSource::Input,
                None => {
                    return Err(ScheduleError::UnsatisfiedRead {
                        pass: pass.name().to_string(),
                        resource,
                    })
                }
            };
            pass_routes.insert(resource, source);
        }
        routes.push(pass_routes);
        for resource in pass.writes().iter() {
            last_writer.insert(resource, i);
        }
    }

    Ok(SchedulePlan { routes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::PassContext;
    use horde_core::PassError;

    struct Stub {
        name: &'static str,
        reads: ResourceSet,
        writes: ResourceSet,
    }

    impl CrowdPass for Stub {
        fn name(&self) -> &str {
            self.name
        }
        fn reads(&self) -> ResourceSet {
            self.reads
        }
        fn writes(&self) -> ResourceSet {
            self.writes
        }
        fn step(&mut self, _ctx: &mut PassContext<'_>) -> Result<(), PassError> {
            Ok(())
        }
    }

    fn stub(name: &'static str, reads: &[Resource], writes: &[Resource]) -> Box<dyn CrowdPass> {
        Box::new(Stub {
            name,
            reads: reads.iter().copied().collect(),
            writes: writes.iter().copied().collect(),
        })
    }

    fn inputs() -> ResourceSet {
        [
            Resource::Walkable,
            Resource::FlowField,
            Resource::WallField,
            Resource::Speeds,
            Resource::Positions,
            Resource::Directions,
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn empty_schedule_is_rejected() {
        assert_eq!(
            validate_schedule(&[], inputs()).unwrap_err(),
            ScheduleError::EmptySchedule
        );
    }

    #[test]
    fn reads_route_to_latest_writer() {
        let passes = vec![
            stub("pressure", &[Resource::Positions], &[Resource::Pressure]),
            stub(
                "steer",
                &[Resource::Pressure, Resource::Positions],
                &[Resource::Positions],
            ),
            stub("separate", &[Resource::Positions], &[Resource::Positions]),
        ];
        let plan = validate_schedule(&passes, inputs()).unwrap();
        assert_eq!(plan.len(), 3);
        assert_eq!(plan.source(0, Resource::Positions), Some(ReadSource::Input));
        assert_eq!(
            plan.source(1, Resource::Pressure),
            Some(ReadSource::Stage { writer_index: 0 })
        );
        assert_eq!(
            plan.source(2, Resource::Positions),
            Some(ReadSource::Stage { writer_index: 1 })
        );
        assert_eq!(plan.dependencies(1), vec![0]);
        assert_eq!(plan.source(2, Resource::Pressure), None);
    }

    #[test]
    fn pressure_read_before_written_is_unsatisfied() {
        let passes = vec![
            stub("steer", &[Resource::Pressure], &[Resource::Positions]),
            stub("pressure", &[Resource::Positions], &[Resource::Pressure]),
        ];
        let err = validate_schedule(&passes, inputs()).unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::UnsatisfiedRead { ref pass, resource: Resource::Pressure } if pass == "steer"
        ));
    }

    #[test]
    fn two_pressure_writers_conflict() {
        let passes = vec![
            stub("a", &[], &[Resource::Pressure]),
            stub("b", &[], &[Resource::Pressure]),
        ];
        match validate_schedule(&passes, inputs()).unwrap_err() {
            ScheduleError::WriteConflict(c) => {
                assert_eq!(c.len(), 1);
                assert_eq!(c[0].first_writer, "a");
                assert_eq!(c[0].second_writer, "b");
            }
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[test]
    fn writing_an_engine_field_is_rejected() {
        let passes = vec![stub("rogue", &[], &[Resource::FlowField])];
        let err = validate_schedule(&passes, inputs()).unwrap_err();
        assert!(format!("{err}").contains("flow_field"));
    }
}
