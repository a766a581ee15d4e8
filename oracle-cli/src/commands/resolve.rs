//! `resolve`: run the decision pipeline for one market and sign the result

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Duration as ChronoDuration;
use oracle_core::{Decision, MarketQuestion, OracleError, Stage};
use oracle_research::{DecisionPipeline, OpenAIReasoner};
use oracle_signer::{Attestation, OracleWallet, ProposalSigner};
use oracle_tools::{standard_registry, MetricsCollector, ToolMetricsSnapshot};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::OracleConfig;

use super::{emit_json, read_json};

#[derive(Debug, Clone)]
pub struct ResolveArgs {
    pub question: PathBuf,
    pub output: Option<PathBuf>,
    pub sign: bool,
}

/// Everything produced by one resolution run
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionReport {
    pub question: MarketQuestion,
    pub decision: Decision,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attestation: Option<Attestation>,
    pub tool_metrics: Vec<ToolMetricsSnapshot>,
}

pub async fn resolve(config: &OracleConfig, args: ResolveArgs) -> anyhow::Result<()> {
    let question: MarketQuestion = read_json(&args.question, "market question").await?;
    question.validate()?;

    // Fail on signing configuration before spending on reasoning calls
    let signer = if args.sign {
        let wallet = OracleWallet::from_private_key(config.require_private_key()?).map_err(OracleError::from)?;
        let validity = ChronoDuration::from_std(config.proposal_validity)
            .map_err(|e| OracleError::config(format!("ORACLE_PROPOSAL_VALIDITY_SECS out of range: {e}")))?;
        Some(ProposalSigner::new(wallet, config.domain()?).with_validity(validity))
    } else {
        None
    };

    let collector = Arc::new(MetricsCollector::new());
    let registry = Arc::new(standard_registry(&config.tools, &collector)?);
    info!("Registered {} tools", registry.len());

    let reasoner = OpenAIReasoner::new(config.require_openai_key()?)?
        .with_base_url(&config.openai_base_url)
        .with_model(&config.openai_model);
    info!("Using model {}", reasoner.model());

    let pipeline = DecisionPipeline::new(Arc::new(reasoner), registry);

    let cancel = CancellationToken::new();
    let watchdog = spawn_watchdog(cancel.clone(), config.run_timeout);

    let outcome = pipeline.run(&question, &cancel).await;
    watchdog.abort();
    let decision = outcome?;

    info!(
        "Decided outcome {} with confidence {:.2} ({} facts, {} citations)",
        decision.outcome_id,
        decision.confidence,
        decision.facts.len(),
        decision.citations.len()
    );

    let attestation = match &signer {
        Some(signer) => Some(
            signer
                .sign_decision(&question, &decision)
                .await
                .map_err(|e| OracleError::from(e).in_stage(Stage::Sign))?,
        ),
        None => {
            warn!("Signing disabled, report carries no attestation");
            None
        }
    };

    let tool_metrics = collector.snapshots();
    for snapshot in &tool_metrics {
        info!(
            "Tool {}: {} calls, {} errors, avg {:?}",
            snapshot.tool,
            snapshot.invocations,
            snapshot.errors,
            snapshot.average_duration()
        );
    }

    let report = ResolutionReport {
        question,
        decision,
        attestation,
        tool_metrics,
    };
    emit_json(&report, args.output.as_deref()).await
}

/// Cancel the run on Ctrl-C or once the run deadline passes
fn spawn_watchdog(cancel: CancellationToken, deadline: std::time::Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => warn!("Interrupted, cancelling run"),
            _ = tokio::time::sleep(deadline) => warn!("Run deadline of {:?} reached, cancelling", deadline),
            _ = cancel.cancelled() => return,
        }
        cancel.cancel();
    })
}
