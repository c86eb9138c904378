//! Markup bodies used by the Foundations product.
//!
//! Documents are rewritten by streaming their events through a writer, so the
//! root element, attributes, declarations and whitespace come out exactly as
//! they went in. Only the text content of the named elements changes.

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesStart, BytesText, Event};
use std::collections::{HashMap, HashSet};
use tempo_common::error::ServiceError;
use thiserror::Error;

pub const DELTA_TIME: &str = "delta_time";
pub const UPDATED_AT: &str = "updated_at";
pub const PATH_STEP_SCORE: &str = "path_step_score";
pub const NUMBER_OF_CHALLENGES: &str = "number_of_challenges";
pub const SCORE_CORRECT: &str = "score_correct";
pub const PATH_STEP_MEDIA_ID: &str = "path_step_media_id";

#[derive(Debug, Error)]
pub enum MarkupError {
    #[error("Failed to parse markup at byte {position}: {message}")]
    Parse { position: u64, message: String },
    #[error("Failed to write markup: {0}")]
    Write(String),
    #[error("Element <{0}> not found")]
    MissingElement(String),
}

impl From<MarkupError> for ServiceError {
    fn from(err: MarkupError) -> Self {
        ServiceError::MalformedPayload(err.to_string())
    }
}

fn read_events(xml: &str) -> impl Iterator<Item = Result<Event<'_>, MarkupError>> {
    let mut reader = Reader::from_str(xml);
    let mut failed = false;
    std::iter::from_fn(move || {
        if failed {
            return None;
        }
        match reader.read_event() {
            Ok(Event::Eof) => None,
            Ok(event) => Some(Ok(event)),
            Err(e) => {
                failed = true;
                Some(Err(MarkupError::Parse {
                    position: reader.error_position(),
                    message: e.to_string(),
                }))
            }
        }
    })
}

fn is_named(start: &BytesStart, name: &str) -> bool {
    start.local_name().as_ref() == name.as_bytes()
}

fn local_name(start: &BytesStart) -> String {
    String::from_utf8_lossy(start.local_name().as_ref()).into_owned()
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), MarkupError> {
    writer
        .write_event(event)
        .map_err(|e| MarkupError::Write(e.to_string()))
}

/// Stream `events` to a string, replacing the text of every element named in
/// `fields`. Returns the output and the names that were matched.
fn rewrite_stream<'a, I>(
    events: I,
    fields: &[(&str, &str)],
) -> Result<(String, HashSet<String>), MarkupError>
where
    I: IntoIterator<Item = Result<Event<'a>, MarkupError>>,
{
    let mut writer = Writer::new(Vec::new());
    let mut found = HashSet::new();
    // Depth inside an element whose original content is being dropped.
    let mut skipping = 0usize;

    for event in events {
        let event = event?;
        if skipping > 0 {
            match &event {
                Event::Start(_) => skipping += 1,
                Event::End(_) => {
                    skipping -= 1;
                    if skipping == 0 {
                        write(&mut writer, event)?;
                    }
                }
                _ => {}
            }
            continue;
        }

        match event {
            Event::Start(start) => {
                let replacement = fields.iter().find(|(name, _)| is_named(&start, name));
                write(&mut writer, Event::Start(start))?;
                if let Some((name, text)) = replacement {
                    found.insert(name.to_string());
                    write(&mut writer, Event::Text(BytesText::new(text)))?;
                    skipping = 1;
                }
            }
            Event::Empty(start) => {
                match fields.iter().find(|(name, _)| is_named(&start, name)) {
                    Some((name, text)) => {
                        found.insert(name.to_string());
                        let end = start.to_end().into_owned();
                        write(&mut writer, Event::Start(start))?;
                        write(&mut writer, Event::Text(BytesText::new(text)))?;
                        write(&mut writer, Event::End(end))?;
                    }
                    None => write(&mut writer, Event::Empty(start))?,
                }
            }
            Event::Eof => break,
            other => write(&mut writer, other)?,
        }
    }

    let output =
        String::from_utf8(writer.into_inner()).map_err(|e| MarkupError::Write(e.to_string()))?;
    Ok((output, found))
}

fn require(found: &HashSet<String>, names: &[&str]) -> Result<(), MarkupError> {
    match names.iter().find(|name| !found.contains(**name)) {
        Some(missing) => Err(MarkupError::MissingElement(missing.to_string())),
        None => Ok(()),
    }
}

/// Set `delta_time` and `updated_at` in a time document, leaving every other
/// byte, the root element included, unchanged.
pub fn rewrite_time_document(
    xml: &str,
    delta_ms: u64,
    updated_at: &str,
) -> Result<String, MarkupError> {
    let delta = delta_ms.to_string();
    let fields = [(DELTA_TIME, delta.as_str()), (UPDATED_AT, updated_at)];
    let (output, found) = rewrite_stream(read_events(xml), &fields)?;
    require(&found, &[DELTA_TIME, UPDATED_AT])?;
    Ok(output)
}

/// One `path_step_score` element of a course score document.
#[derive(Debug, Clone)]
pub struct ScoreStep {
    pub number_of_challenges: String,
    pub score_correct: String,
    pub media_id: String,
    events: Vec<Event<'static>>,
}

impl ScoreStep {
    /// Every challenge of the step is already answered correctly.
    pub fn is_satisfied(&self) -> bool {
        self.score_correct == self.number_of_challenges
    }

    /// The element serialized with `score_correct` raised to
    /// `number_of_challenges`.
    pub fn render_completed(&self) -> Result<String, MarkupError> {
        let fields = [(SCORE_CORRECT, self.number_of_challenges.as_str())];
        let (output, found) = rewrite_stream(self.events.iter().cloned().map(Ok), &fields)?;
        require(&found, &[SCORE_CORRECT])?;
        Ok(output)
    }
}

struct StepBuilder {
    events: Vec<Event<'static>>,
    depth: usize,
    field: Option<String>,
    texts: HashMap<String, String>,
}

impl StepBuilder {
    fn new(start: Event<'static>) -> Self {
        Self {
            events: vec![start],
            depth: 0,
            field: None,
            texts: HashMap::new(),
        }
    }

    /// Feed the next event. Returns true once the element has closed.
    fn push(&mut self, event: Event<'static>) -> Result<bool, MarkupError> {
        let mut closed = false;
        match &event {
            Event::Start(start) => {
                self.depth += 1;
                if self.depth == 1 {
                    let name = local_name(start);
                    self.texts.entry(name.clone()).or_default();
                    self.field = Some(name);
                }
            }
            Event::End(_) => {
                if self.depth == 0 {
                    closed = true;
                } else {
                    if self.depth == 1 {
                        self.field = None;
                    }
                    self.depth -= 1;
                }
            }
            Event::Empty(start) if self.depth == 0 => {
                self.texts.entry(local_name(start)).or_default();
            }
            Event::Text(text) if self.depth == 1 => {
                let value = text
                    .unescape()
                    .map_err(|e| MarkupError::Parse {
                        position: 0,
                        message: e.to_string(),
                    })?;
                self.append(&value);
            }
            Event::CData(data) if self.depth == 1 => {
                let value = String::from_utf8_lossy(data).into_owned();
                self.append(&value);
            }
            _ => {}
        }
        self.events.push(event);
        Ok(closed)
    }

    fn append(&mut self, value: &str) {
        if let Some(field) = &self.field {
            self.texts.entry(field.clone()).or_default().push_str(value);
        }
    }

    fn finish(mut self) -> ScoreStep {
        let mut take = |name: &str| {
            self.texts
                .remove(name)
                .map(|v| v.trim().to_string())
                .unwrap_or_default()
        };
        let number_of_challenges = take(NUMBER_OF_CHALLENGES);
        let score_correct = take(SCORE_CORRECT);
        let media_id = take(PATH_STEP_MEDIA_ID);
        ScoreStep {
            number_of_challenges,
            score_correct,
            media_id,
            events: self.events,
        }
    }
}

/// Every `path_step_score` element in a score document, in document order.
pub fn score_steps(xml: &str) -> Result<Vec<ScoreStep>, MarkupError> {
    let mut steps = Vec::new();
    let mut current: Option<StepBuilder> = None;

    for event in read_events(xml) {
        let event = event?.into_owned();

        if let Some(builder) = current.as_mut() {
            if builder.push(event)? {
                if let Some(builder) = current.take() {
                    steps.push(builder.finish());
                }
            }
            continue;
        }

        let opens = matches!(&event, Event::Start(start) if is_named(start, PATH_STEP_SCORE));
        let empty = matches!(&event, Event::Empty(start) if is_named(start, PATH_STEP_SCORE));
        if opens {
            current = Some(StepBuilder::new(event));
        } else if empty {
            steps.push(StepBuilder::new(event).finish());
        }
    }

    if current.is_some() {
        return Err(MarkupError::Parse {
            position: xml.len() as u64,
            message: format!("unclosed <{}>", PATH_STEP_SCORE),
        });
    }
    Ok(steps)
}
