/// Closed set of icon keys a policy record may carry.
///
/// Unknown keys resolve to [`IconKey::Default`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IconKey {
    Wallet,
    GraduationCap,
    Heart,
    Home,
    Scale,
    Briefcase,
    Users,
    Leaf,
    Default,
}

impl From<&str> for IconKey {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().replace(['_', ' '], "-").as_str() {
            "wallet" | "money" | "banknote" => IconKey::Wallet,
            "graduation-cap" | "education" | "school" => IconKey::GraduationCap,
            "heart" | "health" => IconKey::Heart,
            "home" | "house" | "housing" => IconKey::Home,
            "scale" | "gavel" | "legal" => IconKey::Scale,
            "briefcase" | "business" | "work" => IconKey::Briefcase,
            "users" | "people" | "community" => IconKey::Users,
            "leaf" | "agriculture" | "sprout" => IconKey::Leaf,
            _ => IconKey::Default,
        }
    }
}

impl IconKey {
    /// Glyph shown next to the policy name in text output
    pub fn glyph(&self) -> &'static str {
        match self {
            IconKey::Wallet => "💰",
            IconKey::GraduationCap => "🎓",
            IconKey::Heart => "❤",
            IconKey::Home => "🏠",
            IconKey::Scale => "⚖",
            IconKey::Briefcase => "💼",
            IconKey::Users => "👥",
            IconKey::Leaf => "🌱",
            IconKey::Default => "📄",
        }
    }
}
