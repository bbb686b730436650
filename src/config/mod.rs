// src/config/mod.rs

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::{fs, path::Path};

/// Static description of one progress report: the spreadsheet and the object
/// tabs to load from it. Read once per run and passed into the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReportConfig {
    /// Spreadsheet id, the long token in the report URL.
    pub report_id: String,
    /// gid of every object tab, in load order.
    pub sheet_gids: Vec<String>,
}

/// Load the report description from a YAML file. Any problem here is fatal to
/// the whole run, so the errors name the file.
pub fn load<P: AsRef<Path>>(path: P) -> Result<ReportConfig> {
    let path = path.as_ref();
    let text =
        fs::read_to_string(path).with_context(|| format!("reading config {:?}", path))?;
    let config: ReportConfig =
        serde_yaml::from_str(&text).with_context(|| format!("parsing config {:?}", path))?;

    if config.report_id.trim().is_empty() {
        bail!("config {:?} has an empty report_id", path);
    }
    if config.sheet_gids.is_empty() {
        bail!("config {:?} lists no sheet gids", path);
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn loads_report_id_and_gids_in_order() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "report_id: \"1AbCdEf\"")?;
        writeln!(file, "sheet_gids:")?;
        writeln!(file, "  - \"0\"")?;
        writeln!(file, "  - \"314159\"")?;

        let config = load(file.path())?;
        assert_eq!(config.report_id, "1AbCdEf");
        assert_eq!(config.sheet_gids, vec!["0", "314159"]);
        Ok(())
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = load("definitely/not/here.yaml").unwrap_err();
        assert!(format!("{:#}", err).contains("not/here.yaml"));
    }

    #[test]
    fn malformed_yaml_is_an_error() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "report_id: [unterminated")?;
        assert!(load(file.path()).is_err());
        Ok(())
    }

    #[test]
    fn empty_gid_list_is_an_error() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "report_id: \"1AbCdEf\"")?;
        writeln!(file, "sheet_gids: []")?;
        assert!(load(file.path()).is_err());
        Ok(())
    }
}
