use bl_core::pricing::format_price;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    Status(String),

    JobProgress {
        job_id: String,
        progress: u8,
    },
    JobRetrying {
        job_id: String,
        error: String,
    },
    JobComplete {
        job_id: String,
        data: Value,
    },
    JobFailed {
        job_id: String,
        error: String,
    },

    OrderPlaced {
        order_id: String,
        total: u64,
    },
    PaymentFailed {
        error: String,
    },
}

impl AppEvent {
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            Self::JobComplete { .. } | Self::JobFailed { .. } | Self::OrderPlaced { .. }
        )
    }

    /// One line of CLI output
    pub fn render(&self) -> String {
        match self {
            Self::Status(message) => message.clone(),
            Self::JobProgress { job_id, progress } => {
                format!("⚡ {} {progress:>3}% {}", short_id(job_id), progress_bar(*progress))
            }
            Self::JobRetrying { job_id, error } => {
                format!("⏳ {} retrying: {error}", short_id(job_id))
            }
            Self::JobComplete { job_id, data } => {
                let mut line = format!("✅ {} complete", short_id(job_id));
                if let Some(url) = data.get("modelUrl").and_then(Value::as_str) {
                    line.push_str(&format!(" - model ready: {url}"));
                }
                if let Some(polys) = data.get("polyCount").and_then(Value::as_u64) {
                    line.push_str(&format!(" ({polys} polys)"));
                }
                line
            }
            Self::JobFailed { job_id, error } => {
                format!("❌ {} failed: {error}", short_id(job_id))
            }
            Self::OrderPlaced { order_id, total } => {
                format!("✅ Payment of {} held in escrow. Order {order_id}", format_price(*total))
            }
            Self::PaymentFailed { error } => format!("❌ Payment failed: {error}"),
        }
    }
}

/// `JOB_` plus the last eight characters, upper-cased
fn short_id(job_id: &str) -> String {
    let count = job_id.chars().count();
    let tail: String = job_id.chars().skip(count.saturating_sub(8)).collect();
    format!("JOB_{}", tail.to_uppercase())
}

fn progress_bar(progress: u8) -> String {
    let filled = usize::from(progress.min(100)) / 5;
    format!("[{}{}]", "#".repeat(filled), ".".repeat(20 - filled))
}
