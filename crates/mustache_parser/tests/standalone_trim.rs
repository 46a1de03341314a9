use mustache_parser::{ParseErrorKind, Parser, ParserConfig, PartType};
use test_case::test_case;

/// Table-style coverage of the tagged-sum total functions over `PartType`
/// (`can_stand_alone`/`opens_level`/`requires_identifier`), mirroring the
/// reference crate's own `#[test_case(...)]` grid style for per-kind
/// properties (see `block_parser.rs::paragraphs`).
#[test_case(PartType::StaticText, false, false, false; "static text")]
#[test_case(PartType::Interpolation, false, false, true; "interpolation")]
#[test_case(PartType::Raw, false, false, true; "triple mustache")]
#[test_case(PartType::Unescaped, false, false, true; "unescaped ampersand form")]
#[test_case(PartType::Comment, true, false, false; "comment")]
#[test_case(PartType::Section, true, true, true; "section")]
#[test_case(PartType::InvertedSection, true, true, true; "inverted section")]
#[test_case(PartType::CloseSection, true, false, true; "close section")]
#[test_case(PartType::Partial, true, false, true; "partial")]
#[test_case(PartType::Parent, true, true, true; "parent")]
#[test_case(PartType::Block, true, true, true; "block")]
#[test_case(PartType::Delimiters, true, false, false; "delimiter change")]
fn part_type_total_functions(part_type: PartType, can_stand_alone: bool, opens_level: bool, requires_identifier: bool) {
    assert_eq!(part_type.can_stand_alone(), can_stand_alone, "can_stand_alone for {part_type:?}");
    assert_eq!(part_type.opens_level(), opens_level, "opens_level for {part_type:?}");
    assert_eq!(part_type.requires_identifier(), requires_identifier, "requires_identifier for {part_type:?}");
}

/// Identifier-body validation: exactly one whitespace-delimited token,
/// trimmed of leading/trailing spaces and tabs.
#[test_case("{{x}}", true; "single token")]
#[test_case("{{ x }}", true; "surrounded by spaces")]
#[test_case("{{\tx\t}}", true; "surrounded by tabs")]
#[test_case("{{a.b.c}}", true; "dotted path is a single token")]
#[test_case("{{}}", false; "empty body")]
#[test_case("{{   }}", false; "whitespace-only body")]
#[test_case("{{a b}}", false; "two tokens")]
#[test_case("{{a\tb}}", false; "two tokens separated by a tab")]
fn identifier_extraction_accepts_exactly_one_token(source: &str, should_succeed: bool) {
    let result = Parser::from_str(source, ParserConfig::default()).unwrap().parse();
    assert_eq!(result.is_ok(), should_succeed, "parsing {source:?}");
    if !should_succeed {
        assert_eq!(result.unwrap_err().kind, ParseErrorKind::InvalidIdentifier);
    }
}
