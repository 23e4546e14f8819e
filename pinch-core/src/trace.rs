//! Recorded touch traces
//!
//! A trace is a line-oriented script of touch activity:
//!
//! ```text
//! # two fingers spreading apart
//! down a 40 50
//! down b 60 50
//! frame
//! move a 30 50
//! move b 70 50
//! frame 0.016
//! up a
//! up b
//! frame
//! ```
//!
//! Keys name a finger for the duration of its contact; coordinates are screen
//! pixels. `frame` ends a frame, optionally with its duration in seconds.

use std::collections::HashMap;

use nalgebra::Point2;
use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{space0, space1},
    combinator::{all_consuming, map, opt},
    number::complete::float,
    sequence::{preceded, terminated, tuple},
    IResult,
};

use crate::error::{Error, Result};
use crate::input::{PointId, TouchSink};

/// One line of a trace.
#[derive(Debug, Clone, PartialEq)]
pub enum TraceStep {
    Down { key: String, position: Point2<f32> },
    Move { key: String, position: Point2<f32> },
    Up { key: String },
    /// End of a frame, with an explicit duration when given.
    Frame(Option<f32>),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trace {
    pub steps: Vec<TraceStep>,
}

impl Trace {
    /// Parse a whole trace. Blank lines and `#` comments are skipped.
    pub fn parse(input: &str) -> Result<Self> {
        let mut steps = Vec::new();
        for (index, raw) in input.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or_default().trim();
            if line.is_empty() {
                continue;
            }
            let step = match all_consuming(terminated(parse_step, space0))(line) {
                Ok((_, step)) => step,
                Err(_) => {
                    return Err(Error::TraceParse {
                        line: index + 1,
                        message: format!("expected down, move, up or frame, got `{line}`"),
                    })
                }
            };
            if let TraceStep::Frame(Some(dt)) = step {
                if !(dt >= 0.0) {
                    return Err(Error::TraceParse {
                        line: index + 1,
                        message: format!("frame duration must be >= 0, got {dt}"),
                    });
                }
            }
            steps.push(step);
        }
        Ok(Self { steps })
    }

    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Number of `frame` steps.
    pub fn frame_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|step| matches!(step, TraceStep::Frame(_)))
            .count()
    }
}

fn parse_key(input: &str) -> IResult<&str, String> {
    map(
        take_while1(|c: char| c.is_alphanumeric() || c == '_' || c == '-'),
        String::from,
    )(input)
}

fn parse_position(input: &str) -> IResult<&str, Point2<f32>> {
    let (input, x) = preceded(space1, float)(input)?;
    let (input, y) = preceded(space1, float)(input)?;
    Ok((input, Point2::new(x, y)))
}

fn parse_step(input: &str) -> IResult<&str, TraceStep> {
    alt((
        map(
            tuple((tag("down"), space1, parse_key, parse_position)),
            |(_, _, key, position)| TraceStep::Down { key, position },
        ),
        map(
            tuple((tag("move"), space1, parse_key, parse_position)),
            |(_, _, key, position)| TraceStep::Move { key, position },
        ),
        map(preceded(tuple((tag("up"), space1)), parse_key), |key| {
            TraceStep::Up { key }
        }),
        map(
            preceded(tag("frame"), opt(preceded(space1, float))),
            TraceStep::Frame,
        ),
    ))(input)
}

/// Replays a [`Trace`] into a [`TouchSink`] one frame at a time.
#[derive(Debug)]
pub struct TracePlayer {
    trace: Trace,
    cursor: usize,
    default_dt: f32,
    points: HashMap<String, PointId>,
}

impl TracePlayer {
    /// `default_dt` is used for `frame` lines without a duration.
    pub fn new(trace: Trace, default_dt: f32) -> Self {
        Self {
            trace,
            cursor: 0,
            default_dt,
            points: HashMap::new(),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= self.trace.steps.len()
    }

    /// Keys currently in contact.
    pub fn active_keys(&self) -> usize {
        self.points.len()
    }

    /// Start over. Points still down are left to the caller's sink.
    pub fn rewind(&mut self) {
        self.cursor = 0;
        self.points.clear();
    }

    /// Feed the steps of the next frame into `sink` and return the frame
    /// duration, or `None` once the trace is exhausted. Trailing steps with
    /// no closing `frame` count as one last frame.
    pub fn next_frame<S: TouchSink + ?Sized>(&mut self, sink: &mut S) -> Option<f32> {
        let mut replayed = false;
        while let Some(step) = self.trace.steps.get(self.cursor) {
            self.cursor += 1;
            match step {
                TraceStep::Frame(dt) => return Some(dt.unwrap_or(self.default_dt)),
                TraceStep::Down { key, position } => {
                    if self.points.contains_key(key) {
                        tracing::warn!(key = %key, "trace key pressed twice, ignoring");
                    } else {
                        let id = sink.begin_point(*position);
                        self.points.insert(key.clone(), id);
                    }
                }
                TraceStep::Move { key, position } => match self.points.get(key) {
                    Some(id) => sink.move_point(*id, *position),
                    None => tracing::warn!(key = %key, "trace moves a key that is not down"),
                },
                TraceStep::Up { key } => match self.points.remove(key) {
                    Some(id) => sink.end_point(id),
                    None => tracing::warn!(key = %key, "trace lifts a key that is not down"),
                },
            }
            replayed = true;
        }
        replayed.then_some(self.default_dt)
    }
}
