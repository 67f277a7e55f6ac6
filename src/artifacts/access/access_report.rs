use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViolationKind {
    /// Another handle has the file open for writing
    OpenElsewhere,
    PermissionDenied,
    Missing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessViolation {
    pub path: String,
    pub kind: ViolationKind,
    pub message: String,
}

impl AccessViolation {
    pub fn open_elsewhere(path: &str, writers: &[(u32, String)]) -> Self {
        let by = if writers.is_empty() {
            "another process".to_string()
        } else {
            writers
                .iter()
                .map(|(pid, command)| format!("{command} (pid {pid})"))
                .collect::<Vec<_>>()
                .join(", ")
        };

        AccessViolation {
            path: path.to_string(),
            kind: ViolationKind::OpenElsewhere,
            message: format!("File '{path}' is written by {by}"),
        }
    }

    pub fn permission_denied(path: &str, error: &std::io::Error) -> Self {
        AccessViolation {
            path: path.to_string(),
            kind: ViolationKind::PermissionDenied,
            message: format!("File '{path}' cannot be accessed: permission denied ({error})"),
        }
    }

    pub fn missing(path: &str) -> Self {
        AccessViolation {
            path: path.to_string(),
            kind: ViolationKind::Missing,
            message: format!("File '{path}' does not exist"),
        }
    }
}

/// Every violation found by one access check, in the order the paths were given
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{}", render(.violations))]
pub struct AccessReport {
    pub violations: Vec<AccessViolation>,
}

fn render(violations: &[AccessViolation]) -> String {
    let mut lines = vec![format!(
        "{} file(s) cannot be accessed:",
        violations.len()
    )];
    lines.extend(violations.iter().map(|violation| format!("  {}", violation.message)));

    lines.join("\n")
}

impl AccessReport {
    pub fn paths(&self) -> Vec<&str> {
        self.violations
            .iter()
            .map(|violation| violation.path.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn report_lists_every_violation() {
        let report = AccessReport {
            violations: vec![
                AccessViolation::open_elsewhere("a.psd", &[(42, "gimp".to_string())]),
                AccessViolation::missing("b.png"),
            ],
        };

        assert_eq!(
            report.to_string(),
            "2 file(s) cannot be accessed:\n  File 'a.psd' is written by gimp (pid 42)\n  File 'b.png' does not exist"
        );
        assert_eq!(report.paths(), vec!["a.psd", "b.png"]);
        assert_eq!(report.violations[1].kind, ViolationKind::Missing);
    }
}
