//! `routectl simulate`: replay a routing script against an in-memory engine

use crate::definition::{load_document_type, load_file};
use crate::output::{self, OutputFormat};
use crate::script::{Script, Step};
use anyhow::{anyhow, bail, Context};
use routing_engine::{
    ActionCommand, AdHocRoute, DefinitionRegistry, DocumentSnapshot, EngineConfig, RoutingEngine,
};
use routing_types::{DocumentId, DocumentStatus, PrincipalId};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tabled::Tabled;

/// Flags for a simulation run
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulateOptions {
    pub keep_going: bool,
    pub snapshot: bool,
    pub output: OutputFormat,
}

/// One executed step
#[derive(Debug, Clone, Serialize, Tabled)]
pub struct StepReport {
    #[tabled(rename = "#")]
    pub index: usize,
    #[tabled(rename = "DOCUMENT")]
    pub document: String,
    #[tabled(rename = "STEP")]
    pub step: String,
    #[tabled(rename = "RESULT")]
    pub result: String,
    #[tabled(rename = "STATUS")]
    pub status: String,
    #[tabled(skip)]
    pub passed: bool,
}

/// Engine plus the alias table a script runs against
pub struct Simulation {
    engine: RoutingEngine,
    documents: HashMap<String, DocumentId>,
}

impl Simulation {
    pub fn new(engine: RoutingEngine) -> Self {
        Self {
            engine,
            documents: HashMap::new(),
        }
    }

    pub fn engine(&self) -> &RoutingEngine {
        &self.engine
    }

    pub fn document_id(&self, alias: &str) -> anyhow::Result<&DocumentId> {
        self.documents
            .get(alias)
            .ok_or_else(|| anyhow!("no document named '{}' has been created", alias))
    }

    /// Run one step. `Ok` carries the step's result text; an error means
    /// the step failed.
    pub fn run_step(&mut self, step: &Step) -> anyhow::Result<String> {
        match step {
            Step::Create {
                document,
                document_type,
                initiator,
                title,
            } => {
                if self.documents.contains_key(document) {
                    bail!("document alias '{}' is already in use", document);
                }
                let header = self
                    .engine
                    .create_document(document_type, initiator.as_str(), title.as_str())?;
                let result = format!("created {}", header.document_id);
                self.documents.insert(document.clone(), header.document_id);
                Ok(result)
            }
            Step::Adhoc {
                document,
                principal,
                recipient,
                action,
                annotation,
            } => {
                let id = self.document_id(document)?.clone();
                let mut route = AdHocRoute::new(recipient.clone(), *action);
                route.annotation = annotation.clone();
                self.engine
                    .add_adhoc_route(&id, &PrincipalId::new(principal.as_str()), route)?;
                Ok("queued".to_string())
            }
            Step::Route {
                document,
                principal,
            } => {
                let id = self.document_id(document)?.clone();
                let result = self.engine.route_document(&id, principal.as_str())?;
                Ok(format!("level {}", result.route_level))
            }
            Step::Act {
                document,
                principal,
                action,
                annotation,
                expect_rejected,
            } => {
                let id = self.document_id(document)?.clone();
                let mut command = ActionCommand::new(id, principal.as_str(), *action);
                if let Some(annotation) = annotation {
                    command = command.with_annotation(annotation.as_str());
                }
                match (self.engine.submit_action(command), *expect_rejected) {
                    (Ok(result), false) => {
                        let outcome = &result.outcome;
                        Ok(format!(
                            "{} ({} resolved, {} generated)",
                            outcome_label(outcome.outcome.is_applied()),
                            outcome.resolved.len(),
                            outcome.traversal.generated.len()
                        ))
                    }
                    (Ok(_), true) => bail!("expected the engine to reject this action"),
                    (Err(e), true) => Ok(format!("rejected as expected: {}", e)),
                    (Err(e), false) => Err(e.into()),
                }
            }
            Step::Expect {
                document,
                status,
                active_nodes,
                route_level,
            } => {
                let id = self.document_id(document)?.clone();
                let mut problems = Vec::new();

                if let Some(expected) = status {
                    let actual = self.engine.get_state(&id)?;
                    if actual != *expected {
                        problems.push(format!("status is {}, expected {}", actual, expected));
                    }
                }
                if let Some(expected) = active_nodes {
                    let mut actual = self.engine.get_active_node_names(&id)?;
                    let mut expected = expected.clone();
                    actual.sort();
                    expected.sort();
                    if actual != expected {
                        problems.push(format!(
                            "active nodes are {:?}, expected {:?}",
                            actual, expected
                        ));
                    }
                }
                if let Some(expected) = route_level {
                    let actual = self.engine.get_route_level(&id)?;
                    if actual != *expected {
                        problems.push(format!(
                            "route level is {}, expected {}",
                            actual, expected
                        ));
                    }
                }

                if problems.is_empty() {
                    Ok("ok".to_string())
                } else {
                    bail!(problems.join("; "))
                }
            }
        }
    }

    /// Run every step, stopping at the first failure unless `keep_going`
    pub fn run(&mut self, script: &Script, keep_going: bool) -> anyhow::Result<Vec<StepReport>> {
        let mut reports = Vec::with_capacity(script.steps.len());
        for (i, step) in script.steps.iter().enumerate() {
            let index = i + 1;
            let outcome = self.run_step(step);
            let passed = outcome.is_ok();
            let result = match outcome {
                Ok(text) => text,
                Err(e) if keep_going => format!("FAILED: {:#}", e),
                Err(e) => {
                    return Err(e.context(format!("step {} ({})", index, step.describe())));
                }
            };
            tracing::debug!(step = index, passed, result = %result, "Step executed");

            reports.push(StepReport {
                index,
                document: step.document().to_string(),
                step: step.describe(),
                result,
                status: self.status_label(step.document()),
                passed,
            });
        }
        Ok(reports)
    }

    fn status_label(&self, alias: &str) -> String {
        self.documents
            .get(alias)
            .and_then(|id| self.engine.get_state(id).ok())
            .map(|s| s.to_string())
            .unwrap_or_default()
    }

    /// Final snapshots of every document, by alias
    pub fn snapshots(&self) -> anyhow::Result<Vec<(String, DocumentSnapshot)>> {
        let mut aliases: Vec<&String> = self.documents.keys().collect();
        aliases.sort();
        aliases
            .into_iter()
            .map(|alias| -> anyhow::Result<(String, DocumentSnapshot)> {
                let snapshot = self.engine.snapshot(&self.documents[alias])?;
                Ok((alias.clone(), snapshot))
            })
            .collect()
    }

    pub fn status_of(&self, alias: &str) -> anyhow::Result<DocumentStatus> {
        Ok(self.engine.get_state(self.document_id(alias)?)?)
    }
}

fn outcome_label(applied: bool) -> &'static str {
    if applied {
        "applied"
    } else {
        "no-op"
    }
}

/// Build an engine with the given definitions and the script's directory
pub fn build_simulation(
    config: EngineConfig,
    definitions: &[String],
    script: &Script,
) -> anyhow::Result<Simulation> {
    let registry = Arc::new(DefinitionRegistry::new());
    for path in definitions {
        let document_type = load_document_type(path)?;
        let graph = registry
            .version_and_save(document_type)
            .with_context(|| format!("failed to register {}", path))?;
        tracing::info!(
            document_type = %graph.name(),
            version = graph.version(),
            "Definition registered"
        );
    }

    let directory = Arc::new(script.directory.build());
    Ok(Simulation::new(RoutingEngine::new(config, registry, directory)))
}

#[derive(Serialize)]
struct SimulationOutput<'a> {
    steps: &'a [StepReport],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    documents: Vec<(String, DocumentSnapshot)>,
}

pub fn execute(
    config: EngineConfig,
    script_path: &str,
    definitions: &[String],
    options: SimulateOptions,
) -> anyhow::Result<()> {
    let script: Script = load_file(script_path)?;
    let mut simulation = build_simulation(config, definitions, &script)?;
    let reports = simulation.run(&script, options.keep_going)?;
    let failed = reports.iter().filter(|r| !r.passed).count();
    let documents = if options.snapshot {
        simulation.snapshots()?
    } else {
        Vec::new()
    };

    match options.output {
        OutputFormat::Json => output::print_json(&SimulationOutput {
            steps: &reports,
            documents,
        })?,
        OutputFormat::Text => {
            let steps = reports.len();
            output::print_table(reports);
            for (alias, snapshot) in &documents {
                output::print_info(&format!("{}:", alias));
                output::print_json(snapshot)?;
            }
            if failed == 0 {
                output::print_success(&format!("{} steps passed", steps));
            }
        }
    }

    if failed > 0 {
        bail!("{} steps failed", failed);
    }
    Ok(())
}
