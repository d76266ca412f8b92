//! Analyst prompt template and the quick-analysis presets.

const TEMPLATE_HEAD: &str = "
As a professional cryptocurrency data analyst and data visualization expert, please analyze this image.

If the image contains any of the following chart types, please provide detailed professional analysis:

1. **Sentiment Analysis Heatmap**: Analyze market sentiment distribution, hotspot areas, sentiment intensity changes
2. **Confusion Matrix**: Interpret classification accuracy, precision, recall, F1-score and other metrics
3. **Gauge Dashboard**: Analyze current indicator values, threshold settings, risk levels
4. **Histogram Groups**: Analyze data distribution, frequency, statistical characteristics, outliers
5. **Line Chart (Time Series)**: Analyze trends, seasonality, volatility, key time points

Please analyze from the following perspectives:
- Chart type identification and data structure
- Key numerical values and statistical indicators
- Trend and pattern recognition
- Outliers or important observations
- Significance and recommendations for cryptocurrency markets

User question: ";

const TEMPLATE_TAIL: &str = "

Please provide a professional and detailed analysis report.
";

/// Builds a fresh prompt with the trimmed question as the only substitution.
pub fn build_prompt(question: &str) -> String {
    let question = question.trim();
    let mut prompt = String::with_capacity(TEMPLATE_HEAD.len() + question.len() + TEMPLATE_TAIL.len());
    prompt.push_str(TEMPLATE_HEAD);
    prompt.push_str(question);
    prompt.push_str(TEMPLATE_TAIL);
    prompt
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    Comprehensive,
    Trend,
    Risk,
}

impl Preset {
    pub const ALL: [Preset; 3] = [Preset::Comprehensive, Preset::Trend, Preset::Risk];

    pub fn label(&self) -> &'static str {
        match self {
            Preset::Comprehensive => "📊 Comprehensive Analysis",
            Preset::Trend => "📈 Trend Analysis",
            Preset::Risk => "⚠️ Risk Assessment",
        }
    }

    pub fn help(&self) -> &'static str {
        match self {
            Preset::Comprehensive => "Perform comprehensive professional analysis of the chart",
            Preset::Trend => "Focus on analyzing data trends and patterns",
            Preset::Risk => "Analyze from risk management perspective",
        }
    }

    pub fn question(&self) -> &'static str {
        match self {
            Preset::Comprehensive => {
                "Please provide a comprehensive professional analysis of this cryptocurrency data chart"
            }
            Preset::Trend => {
                "Please focus on analyzing trends, patterns and key change points in the chart"
            }
            Preset::Risk => {
                "Please analyze this chart from risk management and investment decision perspective"
            }
        }
    }

    /// Accepts the 1-based button position or a short name.
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "1" | "comprehensive" => Some(Preset::Comprehensive),
            "2" | "trend" => Some(Preset::Trend),
            "3" | "risk" => Some(Preset::Risk),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_embedded_verbatim() {
        let prompt = build_prompt("  Analyze sentiment distribution \n");
        assert!(prompt.contains("User question: Analyze sentiment distribution\n"));
        assert!(prompt.starts_with("\nAs a professional cryptocurrency data analyst"));
        assert!(prompt.ends_with("Please provide a professional and detailed analysis report.\n"));
        assert_eq!(prompt.matches("User question:").count(), 1);
    }

    #[test]
    fn test_template_names_every_chart_category() {
        let prompt = build_prompt("x");
        for category in [
            "Sentiment Analysis Heatmap",
            "Confusion Matrix",
            "Gauge Dashboard",
            "Histogram Groups",
            "Line Chart (Time Series)",
        ] {
            assert!(prompt.contains(category), "missing {}", category);
        }
    }

    #[test]
    fn test_prompts_are_independent() {
        let first = build_prompt("trend");
        let second = build_prompt("risk");
        assert_ne!(first, second);
        assert_eq!(first, build_prompt("trend"));
    }

    #[test]
    fn test_preset_parse() {
        assert_eq!(Preset::parse("1"), Some(Preset::Comprehensive));
        assert_eq!(Preset::parse("Trend"), Some(Preset::Trend));
        assert_eq!(Preset::parse(" risk "), Some(Preset::Risk));
        assert_eq!(Preset::parse("4"), None);
        assert!(Preset::Comprehensive
            .question()
            .starts_with("Please provide a comprehensive"));
    }
}
