/// Default CPU alert threshold in percent.
pub const DEFAULT_CPU_THRESHOLD: u32 = 80;
/// Default memory alert threshold in percent.
pub const DEFAULT_MEMORY_THRESHOLD: u32 = 85;

/// Percentages at which a container is flagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub cpu: u32,
    pub memory: u32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            cpu: DEFAULT_CPU_THRESHOLD,
            memory: DEFAULT_MEMORY_THRESHOLD,
        }
    }
}

/// Alert annotations for a single container.
///
/// `has_alert` is true exactly when `messages` is non-empty; the fields are
/// private so the two cannot drift apart.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Alerts {
    messages: Vec<String>,
}

impl Alerts {
    /// No alerts, used for stopped containers and failed samples.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn has_alert(&self) -> bool {
        !self.messages.is_empty()
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<String> {
        self.messages
    }
}

/// Compares usage percentages against `thresholds`.
///
/// Both checks are inclusive, so a value exactly at its threshold alerts.
/// The CPU message always comes before the memory message.
pub fn evaluate(cpu_percent: f64, memory_percent: f64, thresholds: Thresholds) -> Alerts {
    let mut messages = Vec::with_capacity(2);

    if cpu_percent >= f64::from(thresholds.cpu) {
        messages.push(format!("High CPU usage: {cpu_percent:.1}%"));
    }
    if memory_percent >= f64::from(thresholds.memory) {
        messages.push(format!("High memory usage: {memory_percent:.1}%"));
    }

    Alerts { messages }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_alert_below_thresholds() {
        let alerts = evaluate(79.9, 84.9, Thresholds::default());
        assert!(!alerts.has_alert());
        assert!(alerts.messages().is_empty());
    }

    #[test]
    fn test_cpu_threshold_is_inclusive() {
        let alerts = evaluate(80.0, 10.0, Thresholds::default());
        assert!(alerts.has_alert());
        assert_eq!(alerts.messages(), ["High CPU usage: 80.0%"]);
    }

    #[test]
    fn test_memory_threshold_is_inclusive() {
        let alerts = evaluate(1.0, 85.0, Thresholds::default());
        assert_eq!(alerts.messages(), ["High memory usage: 85.0%"]);
    }

    #[test]
    fn test_both_alerts_cpu_first() {
        let thresholds = Thresholds { cpu: 50, memory: 50 };
        let alerts = evaluate(250.04, 66.66, thresholds);
        assert_eq!(
            alerts.into_messages(),
            vec![
                "High CPU usage: 250.0%".to_owned(),
                "High memory usage: 66.7%".to_owned(),
            ]
        );
    }

    #[test]
    fn test_has_alert_matches_messages() {
        let thresholds = Thresholds { cpu: 30, memory: 60 };
        for cpu in [0.0, 29.9, 30.0, 120.0] {
            for memory in [0.0, 59.9, 60.0, 100.0] {
                let alerts = evaluate(cpu, memory, thresholds);
                assert_eq!(alerts.has_alert(), !alerts.messages().is_empty());
            }
        }
    }
}
