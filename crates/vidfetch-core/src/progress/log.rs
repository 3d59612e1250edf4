//! Accumulated raw output of one process run.

/// Every line the process printed, in arrival order. Exposed as the
/// diagnostic payload when the run fails.
#[derive(Debug, Clone, Default)]
pub struct OutputLog {
    text: String,
    lines: usize,
}

impl OutputLog {
    pub fn push(&mut self, line: &str) {
        self.text.push_str(line);
        self.text.push('\n');
        self.lines += 1;
    }

    pub fn line_count(&self) -> usize {
        self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines == 0
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_lines_in_order() {
        let mut log = OutputLog::default();
        assert!(log.is_empty());
        log.push("[youtube] abc: Downloading webpage");
        log.push("ERROR: unavailable");
        assert_eq!(log.line_count(), 2);
        assert_eq!(
            log.as_str(),
            "[youtube] abc: Downloading webpage\nERROR: unavailable\n"
        );
    }
}
