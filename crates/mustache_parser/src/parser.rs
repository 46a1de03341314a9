use std::io::Read;

use crate::delimiters::Delimiters;
use crate::error::ParseError;
use crate::node::Node;
use crate::reader::{FileReader, ReaderConfig, StringReader};
use crate::scanner::Scanner;
use crate::tree_builder::{BuilderStep, TreeBuilder};

/// The parser's feature set, supplied once at construction. Spec.md §9:
/// "no process-wide state exists" — every parser instance carries its own
/// copy, matching the reference crate's own `ICUMarkdownParser::new(content,
/// include_blocks)` constructor-time configuration style rather than a
/// global flag or a generic type parameter.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    pub delimiters: Delimiters,
    /// Capture the raw template substring between a section's open and
    /// close tags, for a hypothetical lambda evaluator. Off by default.
    pub capture_lambda_inner_text: bool,
    /// Apply the standalone-line whitespace trimming rule. On by default.
    pub trim_standalone_lines: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            delimiters: Delimiters::default(),
            capture_lambda_inner_text: false,
            trim_standalone_lines: true,
        }
    }
}

/// The parsing front-end described by the design: pulls [`crate::part::TextPart`]s
/// from a [`Scanner`] and folds them into a [`Node`] tree via a
/// [`TreeBuilder`]. Single-threaded, synchronous, non-reentrant — a parser
/// that has surfaced an error must be discarded, not reused (spec.md §7).
pub struct Parser {
    scanner: Scanner,
    builder: TreeBuilder,
    last_error: Option<ParseError>,
    finished: bool,
}

impl Parser {
    fn new(scanner: Scanner, config: ParserConfig) -> Self {
        Self {
            scanner,
            builder: TreeBuilder::new(config.delimiters, config.capture_lambda_inner_text, config.trim_standalone_lines),
            last_error: None,
            finished: false,
        }
    }

    /// A parser over an in-memory template. The whole source is presented
    /// to the scanner as a single buffer (spec.md §4.1: "When source =
    /// string, the whole template is presented once").
    pub fn from_str(source: &str, config: ParserConfig) -> Result<Self, ParseError> {
        let reader = Box::new(StringReader::new(source));
        let scanner = Scanner::new(reader, config.delimiters.clone())?;
        Ok(Self::new(scanner, config))
    }

    /// A parser over a bounded-buffer file source, suitable for templates
    /// larger than memory. `reader_config.chunk_size` must be strictly
    /// greater than the delimiter pair's `max_size` (spec.md §4.1); this is
    /// validated eagerly.
    pub fn from_reader<R: Read + 'static>(
        source: R,
        config: ParserConfig,
        reader_config: ReaderConfig,
    ) -> Result<Self, ParseError> {
        reader_config.validate(config.delimiters.max_size())?;
        let reader = Box::new(FileReader::new(source, reader_config));
        let scanner = Scanner::new(reader, config.delimiters.clone())?;
        Ok(Self::new(scanner, config))
    }

    /// The last syntactic/resource error surfaced by this parser. Once set,
    /// the parser has aborted its parse and must not be driven further
    /// (spec.md §7: "Subsequent calls after an aborted parse are not
    /// defined").
    pub fn last_error(&self) -> Option<&ParseError> {
        self.last_error.as_ref()
    }

    /// Cached mode: drive the parser to end-of-input and return the whole
    /// node tree in one call (spec.md §2 step 5, "cached mode").
    pub fn parse(mut self) -> Result<Vec<Node>, ParseError> {
        loop {
            // `streaming = false`: the builder never splits the arena, so
            // the whole tree accumulates in one piece and `BuilderStep::Flush`
            // is never produced here.
            match self.builder.step(&mut self.scanner, false) {
                Ok(BuilderStep::Continue) => continue,
                Ok(BuilderStep::Flush(_)) => unreachable!("cached mode never requests a flush"),
                Ok(BuilderStep::Eos) => {
                    self.builder.trim_last();
                    return Ok(self.builder.into_nodes());
                }
                Err(err) => {
                    self.last_error = Some(err.clone());
                    return Err(err);
                }
            }
        }
    }

    /// Streamed mode: return the next completed batch of nodes, or `None`
    /// once the template is fully consumed (spec.md §2 step 5, "streamed
    /// mode"). A batch is flushed whenever a standalone static-text node
    /// appears at the root level (spec.md §4.4).
    pub fn next_batch(&mut self) -> Result<Option<Vec<Node>>, ParseError> {
        if self.finished {
            return Ok(None);
        }
        loop {
            match self.builder.step(&mut self.scanner, true) {
                Ok(BuilderStep::Continue) => continue,
                Ok(BuilderStep::Flush(batch)) => return Ok(Some(batch)),
                Ok(BuilderStep::Eos) => {
                    self.builder.trim_last();
                    self.finished = true;
                    let nodes = self.builder.nodes().to_vec();
                    return Ok(if nodes.is_empty() { None } else { Some(nodes) });
                }
                Err(err) => {
                    self.last_error = Some(err.clone());
                    self.finished = true;
                    return Err(err);
                }
            }
        }
    }
}
