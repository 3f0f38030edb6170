/// One step of Vikunja's 0..=5 priority scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityLevel {
    pub value: i64,
    pub label: &'static str,
    pub emoji: &'static str,
}

const LEVELS: [PriorityLevel; 6] = [
    PriorityLevel { value: 0, label: "Não definida", emoji: "⚪" },
    PriorityLevel { value: 1, label: "Baixa", emoji: "🟢" },
    PriorityLevel { value: 2, label: "Média", emoji: "🟡" },
    PriorityLevel { value: 3, label: "Alta", emoji: "🟠" },
    PriorityLevel { value: 4, label: "Urgente", emoji: "🔴" },
    PriorityLevel { value: 5, label: "Fazer agora", emoji: "🚨" },
];

/// Level for `value`; anything off the scale reads as "not set".
pub fn priority_level(value: i64) -> &'static PriorityLevel {
    LEVELS
        .iter()
        .find(|l| l.value == value)
        .unwrap_or(&LEVELS[0])
}

/// `🟠 Alta`
pub fn priority_badge(value: i64) -> String {
    let level = priority_level(value);
    format!("{} {}", level.emoji, level.label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_levels_map() {
        assert_eq!(priority_level(3).label, "Alta");
        assert_eq!(priority_badge(5), "🚨 Fazer agora");
    }

    #[test]
    fn off_scale_falls_back_to_unset() {
        assert_eq!(priority_level(-1).value, 0);
        assert_eq!(priority_level(42).value, 0);
    }
}
