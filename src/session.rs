//! Session state and the engine that drives each user action.
//!
//! A [`FlowSession`] is owned by the caller and passed into every
//! [`FlowEngine`] operation. Operations mutate it only after the completion
//! call and every check on its reply have succeeded, so a failed action leaves
//! the previous chart, pivot and context in place.

use std::path::{Path, PathBuf};

use crate::config::EngineConfig;
use crate::display_width::preview;
use crate::error::FlowError;
use crate::gateway::{CompletionGateway, cap_images};
use crate::media::MediaTool;
use crate::pivot::{MatchSource, resolve_pivot};
use crate::prompt::{
    DEFAULT_ATHLETE_PROFILE, PromptKind, PromptRequest, Ruleset, build_prompt, counter_request,
    detect_placeholder, starts_from,
};
use crate::sanitizer::{FALLBACK_GRAPH, has_declaration, sanitize_graph};
use crate::strategy::format_strategy;

pub const NOT_IN_CHART_MESSAGE: &str =
    "Osu! That move is not in the current flow chart. Try another move.";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowSession {
    chart: Option<String>,
    pivot: Option<String>,
    context_labels: Vec<String>,
    athlete: String,
    ruleset: Ruleset,
    ideas: String,
}

impl FlowSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_athlete(mut self, athlete: impl Into<String>) -> Self {
        self.athlete = athlete.into();
        self
    }

    pub fn with_ruleset(mut self, ruleset: Ruleset) -> Self {
        self.ruleset = ruleset;
        self
    }

    pub fn with_ideas(mut self, ideas: impl Into<String>) -> Self {
        self.ideas = ideas.into();
        self
    }

    /// Resumes from a chart produced earlier. The text is sanitized on the way in.
    pub fn with_chart(mut self, chart: &str) -> Self {
        self.chart = Some(sanitize_graph(chart));
        self
    }

    pub fn chart(&self) -> Option<&str> {
        self.chart.as_deref()
    }

    pub fn pivot(&self) -> Option<&str> {
        self.pivot.as_deref()
    }

    pub fn context_labels(&self) -> &[String] {
        &self.context_labels
    }

    pub fn ruleset(&self) -> Ruleset {
        self.ruleset
    }

    pub fn ideas(&self) -> &str {
        &self.ideas
    }

    /// The athlete description sent with prompts.
    pub fn athlete(&self) -> &str {
        if self.athlete.trim().is_empty() {
            DEFAULT_ATHLETE_PROFILE
        } else {
            &self.athlete
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NextMove {
    /// A new chart was generated from `pivot` and stored in the session.
    Advanced { pivot: String, source: MatchSource },
    /// The move is not in the current chart; the session is unchanged.
    NotInChart,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CounterOutcome {
    Graph(String),
    Strategy(Vec<String>),
}

/// Options for [`FlowEngine::analyse_match`].
#[derive(Debug, Clone, Default)]
pub struct MatchReview<'a> {
    pub subject: &'a str,
    pub keywords: &'a str,
    pub persona: Option<&'a str>,
    /// Only this `(start, end)` span of the video, in seconds.
    pub clip: Option<(f64, f64)>,
}

pub struct FlowEngine<G> {
    gateway: G,
    config: EngineConfig,
}

impl<G: CompletionGateway> FlowEngine<G> {
    pub fn new(gateway: G, config: EngineConfig) -> Self {
        Self { gateway, config }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Generates a fresh radial chart centred on `focus` and makes it current.
    pub fn generate_graph(
        &self,
        session: &mut FlowSession,
        focus: &str,
    ) -> Result<String, FlowError> {
        let request = PromptRequest::Fresh {
            athlete: session.athlete(),
            focus,
            ruleset: session.ruleset,
            ideas: &session.ideas,
        };
        let chart = self.request_graph(&request)?;

        tracing::info!(focus, "generated new chart");
        session.chart = Some(chart.clone());
        session.pivot = Some(focus.trim().to_string());
        session.context_labels.clear();
        Ok(chart)
    }

    /// Moves the session to the chart element `query` names and generates the
    /// chart that continues from it.
    pub fn pick_next_move(
        &self,
        session: &mut FlowSession,
        query: &str,
    ) -> Result<NextMove, FlowError> {
        let chart = session.chart.as_deref().ok_or(FlowError::NoChart)?;
        let Some(found) = resolve_pivot(chart, query) else {
            tracing::info!(query, "move is not in the current chart");
            return Ok(NextMove::NotInChart);
        };

        let request = PromptRequest::Pivot {
            pivot: &found.label,
            athlete: session.athlete(),
            ruleset: session.ruleset,
            ideas: &session.ideas,
            context_labels: &found.context_labels,
        };
        let chart = self.request_graph(&request)?;

        tracing::info!(
            pivot = %found.label,
            context = found.context_labels.len(),
            "advanced to next move"
        );
        session.chart = Some(chart);
        session.pivot = Some(found.label.clone());
        session.context_labels = found.context_labels;
        Ok(NextMove::Advanced {
            pivot: found.label,
            source: found.source,
        })
    }

    /// Counters an opponent's chart with a chart, or their written plan with a strategy.
    pub fn counter(
        &self,
        session: &FlowSession,
        opponent: &str,
    ) -> Result<CounterOutcome, FlowError> {
        let request = counter_request(opponent, session.athlete(), session.ruleset);
        if request.kind() == PromptKind::CounterGraph {
            return self.request_graph(&request).map(CounterOutcome::Graph);
        }
        let reply = self.complete(&request, &[])?;
        Ok(CounterOutcome::Strategy(format_strategy(&reply)))
    }

    /// Estimates the athlete's build from images and keeps it as the session's profile.
    pub fn estimate_attributes(
        &self,
        session: &mut FlowSession,
        subject: &str,
        images: &[Vec<u8>],
    ) -> Result<String, FlowError> {
        let request = PromptRequest::Attributes { subject };
        let reply = self.complete(&request, images)?;
        session.athlete = reply.trim().to_string();
        Ok(reply)
    }

    /// Three next-step options for the position shown in `images`.
    pub fn recommend(
        &self,
        session: &FlowSession,
        subject: &str,
        keywords: &str,
        images: &[Vec<u8>],
    ) -> Result<String, FlowError> {
        let request = PromptRequest::Recommendations {
            subject,
            ruleset: session.ruleset,
            keywords,
            athlete: session.athlete(),
        };
        self.complete(&request, images)
    }

    /// Reviews a match video. Without usable frames the review is requested as text only.
    pub fn analyse_match<M: MediaTool>(
        &self,
        media: &M,
        session: &FlowSession,
        video: &Path,
        review: &MatchReview<'_>,
    ) -> Result<String, FlowError> {
        let frames = self.sample_frames(media, video, review.clip);
        let request = PromptRequest::MatchAnalysis {
            subject: review.subject,
            ruleset: session.ruleset,
            keywords: review.keywords,
            persona: review.persona,
        };
        self.complete(&request, &frames)
    }

    fn complete(
        &self,
        request: &PromptRequest<'_>,
        images: &[Vec<u8>],
    ) -> Result<String, FlowError> {
        let prompt = build_prompt(request);
        let kind = request.kind();
        tracing::debug!(
            gateway = self.gateway.name(),
            ?kind,
            images = images.len(),
            prompt = %preview(&prompt),
            "requesting completion"
        );
        let reply = if images.is_empty() {
            self.gateway
                .complete_text(&prompt, Some(kind.system_instructions()))?
        } else {
            self.gateway.complete_vision(&prompt, cap_images(images))?
        };
        Ok(reply)
    }

    /// Requests a chart, retrying generation failures up to the configured attempts.
    fn request_graph(&self, request: &PromptRequest<'_>) -> Result<String, FlowError> {
        let kind = request.kind();
        let prompt = build_prompt(request);
        let required = request.required_start();
        let attempts = self.config.max_attempts.max(1);

        let mut attempt = 1;
        loop {
            tracing::debug!(
                gateway = self.gateway.name(),
                ?kind,
                attempt,
                prompt = %preview(&prompt),
                "requesting chart"
            );
            let reply = self
                .gateway
                .complete_text(&prompt, Some(kind.system_instructions()))?;
            match check_graph_reply(kind, &reply, required.as_deref()) {
                Ok(chart) => return Ok(chart),
                Err(err) if err.is_retryable() && attempt < attempts => {
                    tracing::warn!(error = %err, attempt, "chart rejected, retrying");
                    attempt += 1;
                }
                Err(err) => {
                    tracing::warn!(error = %err, reply = %preview(&reply), "chart rejected");
                    return Err(err);
                }
            }
        }
    }

    fn sample_frames<M: MediaTool>(
        &self,
        media: &M,
        video: &Path,
        clip: Option<(f64, f64)>,
    ) -> Vec<Vec<u8>> {
        // holds the trimmed clip until the frames are read
        let mut _clip_dir = None;
        let mut source = video.to_path_buf();
        if let Some((start, end)) = clip {
            match trim_to_temp(media, video, start, end) {
                Ok((dir, path)) => {
                    _clip_dir = Some(dir);
                    source = path;
                }
                Err(err) => {
                    tracing::warn!(error = %err, "could not trim video, using the whole file")
                }
            }
        }
        match media.extract_frames(&source, self.config.frame_samples) {
            Ok(frames) => frames,
            Err(err) => {
                tracing::warn!(error = %err, "frame extraction failed, continuing without images");
                Vec::new()
            }
        }
    }
}

/// Checks a chart reply and sanitizes it.
///
/// Placeholder labels and a missing starting position fail the request. A reply
/// with no diagram at all is a soft failure and becomes the fallback chart.
pub fn check_graph_reply(
    kind: PromptKind,
    reply: &str,
    required_start: Option<&str>,
) -> Result<String, FlowError> {
    if kind.checks_placeholders() {
        if let Some(placeholder) = detect_placeholder(reply, required_start) {
            return Err(FlowError::PlaceholderDetected {
                placeholder: placeholder.to_string(),
            });
        }
    }
    if !has_declaration(reply) {
        tracing::warn!(reply = %preview(reply), "reply has no diagram, using fallback chart");
        return Ok(FALLBACK_GRAPH.to_string());
    }
    if let Some(position) = required_start {
        if !starts_from(reply, position) {
            return Err(FlowError::StartingPositionMissing {
                position: position.to_string(),
            });
        }
    }
    Ok(sanitize_graph(reply))
}

fn trim_to_temp<M: MediaTool>(
    media: &M,
    video: &Path,
    start: f64,
    end: f64,
) -> Result<(tempfile::TempDir, PathBuf), crate::error::MediaError> {
    let end = media.duration(video).map_or(end, |length| end.min(length));
    let dir = tempfile::tempdir()?;
    let extension = video.extension().and_then(|e| e.to_str()).unwrap_or("mp4");
    let output = dir.path().join(format!("clip.{extension}"));
    let path = media.trim(video, start, end, &output)?;
    Ok((dir, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn placeholder_rejected_for_pivot_only() {
        let reply = "graph LR\n    A[\"Mount\"] --> B[\"Position 1\"]";
        let err = check_graph_reply(PromptKind::Pivot, reply, Some("Mount")).unwrap_err();
        assert!(matches!(err, FlowError::PlaceholderDetected { ref placeholder } if placeholder == "Position 1"));
        assert!(check_graph_reply(PromptKind::Fresh, reply, None).is_ok());
    }

    #[test]
    fn missing_start_rejected() {
        let reply = "graph LR\n    A[\"Guard\"] --> B[\"Sweep\"]";
        let err = check_graph_reply(PromptKind::Pivot, reply, Some("Mount")).unwrap_err();
        assert!(matches!(err, FlowError::StartingPositionMissing { .. }));
    }

    #[test]
    fn prose_reply_falls_back() {
        let chart = check_graph_reply(PromptKind::Fresh, "Sorry, I can't draw that.", None).unwrap();
        assert_eq!(chart, FALLBACK_GRAPH);
    }

    #[test]
    fn accepted_reply_is_sanitized() {
        let reply = "```mermaid\ngraph LR\nA[Mount] -->|Isolate arm| B[Armbar]\n```";
        let chart = check_graph_reply(PromptKind::Pivot, reply, Some("Mount")).unwrap();
        assert_eq!(chart, "graph LR\n    A[\"Mount\"] -->|\"Isolate arm\"| B[\"Armbar\"]");
    }

    #[test]
    fn session_defaults() {
        let session = FlowSession::new();
        assert_eq!(session.athlete(), DEFAULT_ATHLETE_PROFILE);
        assert_eq!(session.ruleset(), Ruleset::Mma);
        assert_eq!(session.chart(), None);
        let session = session.with_chart("hello world");
        assert_eq!(session.chart(), Some(FALLBACK_GRAPH));
    }
}
