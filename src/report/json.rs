use super::types::RunReport;
use crate::error::Result;
use std::path::Path;

/// Generate JSON report
pub fn generate(reports: &[RunReport], output: Option<&Path>) -> Result<()> {
    let json = to_json(reports)?;

    if let Some(path) = output {
        std::fs::write(path, json)?;
        println!("JSON report saved to: {}", path.display());
    } else {
        println!("{}", json);
    }

    Ok(())
}

pub fn to_json(reports: &[RunReport]) -> Result<String> {
    Ok(serde_json::to_string_pretty(reports)?)
}
