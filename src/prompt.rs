//! Request text for the completion service.
//!
//! Every builder here is plain string assembly, so prompts can be checked
//! without a network. Graph-shaped requests spell out the output contract the
//! model must follow; [`detect_placeholder`] and [`starts_from`] check a reply
//! against that contract afterwards.

use std::fmt;

use crate::graph_parser::parse_graph;
use crate::sanitizer::has_declaration;

/// Used when no build has been estimated or supplied for the athlete.
pub const DEFAULT_ATHLETE_PROFILE: &str =
    "Average adult male jiu-jitsu practitioner with balanced build";

/// Generic labels a model falls back on instead of naming real techniques.
pub const PLACEHOLDERS: &[&str] = &[
    "Position 1",
    "Position 2",
    "Position 3",
    "Submission 1",
    "Submission 2",
    "Submission 3",
    "Move 1",
    "Move 2",
    "Technique 1",
    "Technique 2",
    "Default Graph",
];

const GRAPH_INSTRUCTIONS: &str = "You are an expert grappling coach who draws Mermaid flowcharts. \
Reply with the Mermaid diagram only.";
const COACH_INSTRUCTIONS: &str = "You are an expert grappling coach.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Ruleset {
    #[default]
    Mma,
    Jiujitsu,
}

impl fmt::Display for Ruleset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ruleset::Mma => f.write_str("MMA"),
            Ruleset::Jiujitsu => f.write_str("Jiu-jitsu"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Fresh,
    Pivot,
    CounterGraph,
    CounterText,
    Attributes,
    Recommendations,
    MatchAnalysis,
}

impl PromptKind {
    /// The reply is expected to be a diagram and goes through the sanitizer.
    pub fn expects_graph(self) -> bool {
        matches!(
            self,
            PromptKind::Fresh | PromptKind::Pivot | PromptKind::CounterGraph
        )
    }

    /// Replies are rejected when they contain a placeholder label.
    pub fn checks_placeholders(self) -> bool {
        matches!(self, PromptKind::Pivot | PromptKind::CounterGraph)
    }

    /// Sent with images through the vision endpoint.
    pub fn is_vision(self) -> bool {
        matches!(
            self,
            PromptKind::Attributes | PromptKind::Recommendations | PromptKind::MatchAnalysis
        )
    }

    pub fn system_instructions(self) -> &'static str {
        if self.expects_graph() {
            GRAPH_INSTRUCTIONS
        } else {
            COACH_INSTRUCTIONS
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PromptRequest<'a> {
    /// Radial chart for a starting focus.
    Fresh {
        athlete: &'a str,
        focus: &'a str,
        ruleset: Ruleset,
        ideas: &'a str,
    },
    /// Left-right chart continuing from a resolved pivot.
    Pivot {
        pivot: &'a str,
        athlete: &'a str,
        ruleset: Ruleset,
        ideas: &'a str,
        context_labels: &'a [String],
    },
    /// Counter chart against an opponent's chart.
    CounterGraph {
        opponent_chart: &'a str,
        athlete: &'a str,
        ruleset: Ruleset,
    },
    /// Prose counter strategy against an opponent's written plan.
    CounterText {
        opponent_plan: &'a str,
        athlete: &'a str,
        ruleset: Ruleset,
    },
    /// Physical build estimate from a still image.
    Attributes { subject: &'a str },
    /// Next-step options from a still frame.
    Recommendations {
        subject: &'a str,
        ruleset: Ruleset,
        keywords: &'a str,
        athlete: &'a str,
    },
    /// Review of a match from sampled frames, optionally in a named coach's voice.
    MatchAnalysis {
        subject: &'a str,
        ruleset: Ruleset,
        keywords: &'a str,
        persona: Option<&'a str>,
    },
}

impl PromptRequest<'_> {
    pub fn kind(&self) -> PromptKind {
        match self {
            PromptRequest::Fresh { .. } => PromptKind::Fresh,
            PromptRequest::Pivot { .. } => PromptKind::Pivot,
            PromptRequest::CounterGraph { .. } => PromptKind::CounterGraph,
            PromptRequest::CounterText { .. } => PromptKind::CounterText,
            PromptRequest::Attributes { .. } => PromptKind::Attributes,
            PromptRequest::Recommendations { .. } => PromptKind::Recommendations,
            PromptRequest::MatchAnalysis { .. } => PromptKind::MatchAnalysis,
        }
    }

    /// The label the reply's chart must start from, when the request fixes one.
    pub fn required_start(&self) -> Option<String> {
        match self {
            PromptRequest::Pivot { pivot, .. } => Some(pivot.to_string()),
            PromptRequest::CounterGraph { opponent_chart, .. } => opponent_start(opponent_chart),
            _ => None,
        }
    }
}

/// Chooses the counter request from the shape of what is being countered.
pub fn counter_request<'a>(opponent: &'a str, athlete: &'a str, ruleset: Ruleset) -> PromptRequest<'a> {
    if has_declaration(opponent) {
        PromptRequest::CounterGraph {
            opponent_chart: opponent,
            athlete,
            ruleset,
        }
    } else {
        PromptRequest::CounterText {
            opponent_plan: opponent,
            athlete,
            ruleset,
        }
    }
}

pub fn build_prompt(request: &PromptRequest<'_>) -> String {
    match request {
        PromptRequest::Fresh {
            athlete,
            focus,
            ruleset,
            ideas,
        } => fresh_prompt(athlete, focus, *ruleset, ideas),
        PromptRequest::Pivot {
            pivot,
            athlete,
            ruleset,
            ideas,
            context_labels,
        } => pivot_prompt(pivot, athlete, *ruleset, ideas, context_labels),
        PromptRequest::CounterGraph {
            opponent_chart,
            athlete,
            ruleset,
        } => counter_graph_prompt(opponent_chart, athlete, *ruleset),
        PromptRequest::CounterText {
            opponent_plan,
            athlete,
            ruleset,
        } => counter_text_prompt(opponent_plan, athlete, *ruleset),
        PromptRequest::Attributes { subject } => attributes_prompt(subject),
        PromptRequest::Recommendations {
            subject,
            ruleset,
            keywords,
            athlete,
        } => recommendations_prompt(subject, *ruleset, keywords, athlete),
        PromptRequest::MatchAnalysis {
            subject,
            ruleset,
            keywords,
            persona,
        } => match_analysis_prompt(subject, *ruleset, keywords, *persona),
    }
}

/// Deny-listed labels a chart starting from `start` may not use. A placeholder
/// that is part of `start` itself is allowed, or the request could never pass.
pub fn forbidden_placeholders(start: Option<&str>) -> impl Iterator<Item = &'static str> {
    PLACEHOLDERS
        .iter()
        .copied()
        .filter(move |p| !start.is_some_and(|s| s.contains(p)))
}

/// First forbidden placeholder present in `reply`.
pub fn detect_placeholder(reply: &str, start: Option<&str>) -> Option<&'static str> {
    forbidden_placeholders(start).find(|p| reply.contains(p))
}

/// The starting position must appear verbatim in the reply.
pub fn starts_from(reply: &str, position: &str) -> bool {
    reply.contains(position)
}

fn athlete_or_default(athlete: &str) -> &str {
    let athlete = athlete.trim();
    if athlete.is_empty() {
        DEFAULT_ATHLETE_PROFILE
    } else {
        athlete
    }
}

fn fresh_prompt(athlete: &str, focus: &str, ruleset: Ruleset, ideas: &str) -> String {
    let mut prompt = format!(
        "I want you to generate a Mermaid based radial visual flow chart of jiu-jitsu moves that will have \
the greatest likelihood of success for an athlete with the following measurables: {}. \
I want this chart to focus on {} under the {ruleset} ruleset",
        athlete_or_default(athlete),
        focus.trim(),
    );
    if !ideas.trim().is_empty() {
        prompt.push_str(&format!(
            ", and take into account that the athlete has the following ideas: {}",
            ideas.trim()
        ));
    }
    prompt.push_str(
        ". Arrange the bubbles in a circle around the starting position. \
Label every flow arrow with a short 3-4 word description of the primary movement required to get to that bubble. \
Only return the mermaid object, with no explanation or surrounding text whatsoever.",
    );
    prompt
}

fn structure_contract(start: &str) -> String {
    format!(
        "Use a left-to-right layout (graph LR). The first node must be exactly \"{start}\". \
Branch from it into 4 to 6 distinct positions or techniques, and give every branch 2 to 3 follow-up moves. \
Label every arrow with a short 3-4 word movement description. \
Name real techniques only. Never use generic labels such as {}.",
        forbidden_placeholders(Some(start))
            .map(|p| format!("\"{p}\""))
            .collect::<Vec<_>>()
            .join(", ")
    )
}

fn pivot_prompt(
    pivot: &str,
    athlete: &str,
    ruleset: Ruleset,
    ideas: &str,
    context_labels: &[String],
) -> String {
    let mut prompt = format!(
        "Generate a Mermaid flow chart of jiu-jitsu moves continuing from \"{pivot}\" for an athlete with \
the following measurables: {} under the {ruleset} ruleset. {}",
        athlete_or_default(athlete),
        structure_contract(pivot),
    );
    if !context_labels.is_empty() {
        prompt.push_str(&format!(
            " Where it makes sense, connect to previously listed positions: {}.",
            context_labels.join(", ")
        ));
    }
    if !ideas.trim().is_empty() {
        prompt.push_str(&format!(
            " Take into account that the athlete has the following ideas: {}.",
            ideas.trim()
        ));
    }
    prompt.push_str(" Only return the mermaid object, with no explanation or surrounding text whatsoever.");
    prompt
}

fn opponent_start(chart: &str) -> Option<String> {
    parse_graph(chart).nodes.first().map(|n| n.label.clone())
}

fn counter_graph_prompt(chart: &str, athlete: &str, ruleset: Ruleset) -> String {
    let start = opponent_start(chart).unwrap_or_else(|| "Opponent Game Plan".to_string());
    format!(
        "My opponent plans to follow this Mermaid flow chart:\n{}\n\
Generate a Mermaid flow chart that counters every branch of it for an athlete with the following \
measurables: {} under the {ruleset} ruleset. {} \
Only return the mermaid object, with no explanation or surrounding text whatsoever.",
        chart.trim(),
        athlete_or_default(athlete),
        structure_contract(&start),
    )
}

fn counter_text_prompt(plan: &str, athlete: &str, ruleset: Ruleset) -> String {
    format!(
        "My opponent plans to use the following game plan:\n{}\n\
Write a structured counter strategy for an athlete with the following measurables: {} under the {ruleset} ruleset. \
Name at least 4 specific counter techniques. Give each one its own numbered point with a short \
explanation of when to use it.",
        plan.trim(),
        athlete_or_default(athlete),
    )
}

fn attributes_prompt(subject: &str) -> String {
    format!(
        "Please analyze this grappling match image and provide an estimate of the {} athlete's \
height, weight, and build. Include details about their body type (such as endomorph, mesomorph, ectomorph), \
muscle mass distribution, limb length proportions, and any notable physical characteristics that might \
affect their performance in grappling.",
        subject.trim()
    )
}

fn keyword_note(keywords: &str, purpose: &str) -> String {
    if keywords.trim().is_empty() {
        String::new()
    } else {
        format!(
            " I want you to also take special note of the following keywords for your {purpose}: {}.",
            keywords.trim()
        )
    }
}

fn recommendations_prompt(subject: &str, ruleset: Ruleset, keywords: &str, athlete: &str) -> String {
    format!(
        "The image is a still frame from a grappling match. The match has {ruleset} rules. \
I want you to analyze: {}, and provide three options for the next immediate steps towards grappling moves \
that would work best for them given their current position and a build of: {}. \
I want these steps to be listed in quick bullet format like ex: \"1) <<step>> : towards <<move>>, 2) ...\". \
Base the recommendations on historical MMA and Jiu-jitsu match performance.{}",
        subject.trim(),
        athlete_or_default(athlete),
        keyword_note(keywords, "image and recommendation analysis"),
    )
}

fn match_analysis_prompt(
    subject: &str,
    ruleset: Ruleset,
    keywords: &str,
    persona: Option<&str>,
) -> String {
    let mut prompt = String::new();
    if let Some(persona) = persona.map(str::trim).filter(|p| !p.is_empty()) {
        prompt.push_str(&format!(
            "You are the famous martial arts practitioner {persona}. Give your analysis in their voice. "
        ));
    }
    prompt.push_str(&format!(
        "These images are frames from a grappling match. The match has {ruleset} rules. \
I want you to analyze: {subject}, and provide an analysis of what went right or wrong during the match, \
along with some recommendations for the {subject} in their next match.{}",
        keyword_note(keywords, "analysis"),
        subject = subject.trim(),
    ));
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn ruleset_labels() {
        assert_eq!(Ruleset::Mma.to_string(), "MMA");
        assert_eq!(Ruleset::Jiujitsu.to_string(), "Jiu-jitsu");
    }

    #[test]
    fn fresh_prompt_forbids_prose() {
        let prompt = build_prompt(&PromptRequest::Fresh {
            athlete: "tall and lanky",
            focus: "bottom game",
            ruleset: Ruleset::Jiujitsu,
            ideas: "",
        });
        assert!(prompt.contains("radial"));
        assert!(prompt.contains("3-4 word"));
        assert!(prompt.contains("tall and lanky"));
        assert!(prompt.contains("focus on bottom game under the Jiu-jitsu ruleset"));
        assert!(prompt.contains("no explanation"));
        assert!(!prompt.contains("following ideas"));
    }

    #[test]
    fn fresh_prompt_uses_default_profile() {
        let prompt = build_prompt(&PromptRequest::Fresh {
            athlete: "  ",
            focus: "top game",
            ruleset: Ruleset::Mma,
            ideas: "leg locks",
        });
        assert!(prompt.contains(DEFAULT_ATHLETE_PROFILE));
        assert!(prompt.contains("following ideas: leg locks"));
    }

    #[test]
    fn pivot_prompt_fixes_first_node_and_context() {
        let context = vec!["Side Control".to_string(), "Armbar".to_string()];
        let request = PromptRequest::Pivot {
            pivot: "Mount",
            athlete: "",
            ruleset: Ruleset::Mma,
            ideas: "",
            context_labels: &context,
        };
        let prompt = build_prompt(&request);
        assert!(prompt.contains("graph LR"));
        assert!(prompt.contains("The first node must be exactly \"Mount\""));
        assert!(prompt.contains("4 to 6 distinct"));
        assert!(prompt.contains("2 to 3 follow-up"));
        assert!(prompt.contains("\"Default Graph\""));
        assert!(prompt.contains("connect to previously listed positions: Side Control, Armbar."));
        assert_eq!(request.required_start().as_deref(), Some("Mount"));
    }

    #[test]
    fn pivot_prompt_without_context_omits_clause() {
        let prompt = build_prompt(&PromptRequest::Pivot {
            pivot: "Mount",
            athlete: "",
            ruleset: Ruleset::Mma,
            ideas: "",
            context_labels: &[],
        });
        assert!(!prompt.contains("previously listed"));
    }

    #[test]
    fn counter_request_detects_graph_input() {
        let chart = "graph TD\n    A[\"Closed Guard\"] --> B[\"Triangle\"]";
        let request = counter_request(chart, "", Ruleset::Mma);
        assert_eq!(request.kind(), PromptKind::CounterGraph);
        assert_eq!(request.required_start().as_deref(), Some("Closed Guard"));
        assert!(build_prompt(&request).contains("counters every branch"));

        let request = counter_request("Pull guard then sweep", "", Ruleset::Mma);
        assert_eq!(request.kind(), PromptKind::CounterText);
        assert_eq!(request.required_start(), None);
        assert!(build_prompt(&request).contains("at least 4 specific counter techniques"));
    }

    #[test]
    fn attributes_prompt_mentions_body_types() {
        let prompt = build_prompt(&PromptRequest::Attributes { subject: "left" });
        assert!(prompt.contains("left athlete's height, weight, and build"));
        assert!(prompt.contains("mesomorph"));
    }

    #[test]
    fn analysis_prompt_with_persona() {
        let prompt = build_prompt(&PromptRequest::MatchAnalysis {
            subject: "both",
            ruleset: Ruleset::Jiujitsu,
            keywords: "guard retention",
            persona: Some("Rickson Gracie"),
        });
        assert!(prompt.starts_with("You are the famous martial arts practitioner Rickson Gracie."));
        assert!(prompt.contains("keywords for your analysis: guard retention."));
    }

    #[test]
    fn kinds_route_correctly() {
        assert!(PromptKind::Pivot.checks_placeholders());
        assert!(!PromptKind::Fresh.checks_placeholders());
        assert!(PromptKind::Recommendations.is_vision());
        assert!(!PromptKind::CounterText.expects_graph());
    }

    #[test]
    fn placeholder_detection() {
        assert_eq!(
            detect_placeholder("A[\"Mount\"] --> B[\"Position 1\"]", None),
            Some("Position 1")
        );
        assert_eq!(detect_placeholder("A[\"Mount\"] --> B[\"Armbar\"]", None), None);
    }

    #[test]
    fn placeholder_in_start_label_is_allowed() {
        let reply = "A[\"Position 1\"] --> B[\"Single Leg\"]";
        assert_eq!(detect_placeholder(reply, Some("Position 1")), None);
        let reply = "A[\"Position 1\"] --> B[\"Position 2\"]";
        assert_eq!(detect_placeholder(reply, Some("Position 1")), Some("Position 2"));

        let prompt = build_prompt(&PromptRequest::Pivot {
            pivot: "Position 1",
            athlete: "",
            ruleset: Ruleset::Jiujitsu,
            ideas: "",
            context_labels: &[],
        });
        assert!(prompt.contains("The first node must be exactly \"Position 1\""));
        assert!(!prompt.contains("such as \"Position 1\""));
        assert!(prompt.contains("such as \"Position 2\""));
    }

    #[test]
    fn start_check_is_verbatim() {
        assert!(starts_from("graph LR\n    A[\"Mount\"] --> B", "Mount"));
        assert!(!starts_from("graph LR\n    A[\"mount\"] --> B", "Mount"));
    }
}
