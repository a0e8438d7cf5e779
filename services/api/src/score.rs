use clap::Args;
use receipt_points::config::AppConfig;
use receipt_points::error::AppError;
use receipt_points::receipts::{
    log_outcome, validate_receipt, EvaluationStatus, PointsEngine, PointsOutcome, Receipt, RuleSet,
};
use receipt_points::telemetry;
use std::path::PathBuf;
use tracing::warn;

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// Receipt JSON file to score
    #[arg(long)]
    pub(crate) receipt: PathBuf,
    /// Rule file to score against (defaults to APP_RULES_PATH)
    #[arg(long)]
    pub(crate) rules: Option<PathBuf>,
    /// Print the per-rule audit trail
    #[arg(long)]
    pub(crate) audit: bool,
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let ScoreArgs {
        receipt,
        rules,
        audit,
    } = args;

    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let rules_path = rules.unwrap_or(config.rules.path);
    let rule_set = RuleSet::from_path(&rules_path)?;
    let raw = std::fs::read_to_string(&receipt)?;
    let receipt: Receipt = serde_json::from_str(&raw)?;

    if let Err(err) = validate_receipt(&receipt) {
        for message in err.messages() {
            warn!(%message, "receipt failed validation, scoring anyway");
        }
    }

    let outcome = PointsEngine::new(&rule_set).score(&receipt);
    log_outcome(&outcome);

    println!("Receipt points");
    println!("  Retailer: {}", receipt.retailer);
    println!("  Rules: {}", rules_path.display());
    if audit {
        println!("{}", render_audit(&outcome));
    }
    println!("  Total points: {}", outcome.total_points);
    Ok(())
}

fn render_audit(outcome: &PointsOutcome) -> String {
    let mut lines = vec!["  Audit trail:".to_string()];
    for evaluation in &outcome.evaluations {
        let status = match &evaluation.status {
            EvaluationStatus::Applied => "applied".to_string(),
            EvaluationStatus::Skipped { reason, .. } => format!("skipped ({reason})"),
        };
        lines.push(format!(
            "    {:<28} {:>5} {:>6}  {}",
            evaluation.rule_name, evaluation.points, evaluation.running_total, status
        ));
        for note in &evaluation.notes {
            lines.push(format!("      - {note}"));
        }
    }
    lines.join("\n")
}
