//! Table rendering.

use super::{Render, RenderContext, sorted_annotations};
use crate::error::Result;
use crate::oci::{Descriptor, artifact_type_of};
use humansize::{BINARY, format_size};
use tabled::settings::Style;
use tabled::{Table, Tabled};

/// One row per direct referrer.
#[derive(Debug, Clone, PartialEq, Eq, Tabled)]
struct ReferrerRow {
    #[tabled(rename = "ARTIFACT TYPE")]
    artifact_type: String,

    #[tabled(rename = "DIGEST")]
    digest: String,

    #[tabled(rename = "SIZE")]
    size: String,
}

/// A row with the referrer's annotations appended.
#[derive(Debug, Clone, PartialEq, Eq, Tabled)]
struct VerboseReferrerRow {
    #[tabled(rename = "ARTIFACT TYPE")]
    artifact_type: String,

    #[tabled(rename = "DIGEST")]
    digest: String,

    #[tabled(rename = "SIZE")]
    size: String,

    #[tabled(rename = "ANNOTATIONS")]
    annotations: String,
}

impl ReferrerRow {
    fn new(descriptor: &Descriptor) -> Self {
        Self {
            artifact_type: artifact_type_of(descriptor).unwrap_or_else(|| "-".to_string()),
            digest: descriptor.digest().to_string(),
            size: format_size(descriptor.size(), BINARY),
        }
    }
}

impl VerboseReferrerRow {
    fn new(descriptor: &Descriptor) -> Self {
        let row = ReferrerRow::new(descriptor);
        let annotations = sorted_annotations(descriptor)
            .into_iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(", ");
        Self {
            artifact_type: row.artifact_type,
            digest: row.digest,
            size: row.size,
            annotations,
        }
    }
}

/// Lists the direct referrers of the subject under a summary header.
pub struct TableRenderer {
    verbose: bool,
}

impl TableRenderer {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl Render for TableRenderer {
    fn render(&self, ctx: &RenderContext<'_>) -> Result<String> {
        let referrers = ctx.direct_referrers();

        let mut out = format!(
            "Discovered {} artifact(s) referencing {}\nDigest: {}\n\n",
            referrers.len(),
            ctx.subject,
            ctx.graph.subject().digest()
        );
        let table = if self.verbose {
            let rows: Vec<VerboseReferrerRow> =
                referrers.iter().map(|d| VerboseReferrerRow::new(d)).collect();
            Table::new(&rows).with(Style::empty()).to_string()
        } else {
            let rows: Vec<ReferrerRow> = referrers.iter().map(|d| ReferrerRow::new(d)).collect();
            Table::new(&rows).with(Style::empty()).to_string()
        };
        out.push_str(&table);
        out.push('\n');
        Ok(out)
    }
}
