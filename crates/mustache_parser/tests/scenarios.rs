
use harness::{assert_content, assert_node, parse, parse_with_lambdas};
use mustache_parser::{ParseErrorKind, Parser, ParserConfig, PartType, ReaderConfig};

#[test]
fn interpolation_and_triple_mustache_track_position() {
    let nodes = parse("Hello{{tag1}}\nWorld{{{ tag2 }}}Until eof");
    assert_eq!(nodes.len(), 5);

    assert_node(&nodes, 0, PartType::StaticText, None);
    assert_content(&nodes, 0, "Hello");
    assert_eq!((nodes[0].text_part.line, nodes[0].text_part.col), (1, 1));

    assert_node(&nodes, 1, PartType::Interpolation, Some("tag1"));
    assert_eq!((nodes[1].text_part.line, nodes[1].text_part.col), (1, 6));

    assert_node(&nodes, 2, PartType::StaticText, None);
    assert_content(&nodes, 2, "\nWorld");
    assert_eq!((nodes[2].text_part.line, nodes[2].text_part.col), (1, 14));

    assert_node(&nodes, 3, PartType::Raw, Some("tag2"));
    assert_eq!((nodes[3].text_part.line, nodes[3].text_part.col), (2, 6));

    assert_node(&nodes, 4, PartType::StaticText, None);
    assert_content(&nodes, 4, "Until eof");
    assert_eq!((nodes[4].text_part.line, nodes[4].text_part.col), (2, 18));
}

#[test]
fn nested_sections_and_inverted_sections_build_a_tree() {
    let source = "{{! Comments block }}\n  Hello\n  {{#section}}\nName: {{name}}\nComments: {{&comments}}\n{{^inverted}}Inverted text{{/inverted}}\n{{/section}}\nWorld";
    let nodes = parse(source);

    assert_node(&nodes, 0, PartType::Comment, None);
    assert_node(&nodes, 1, PartType::StaticText, None);
    assert_content(&nodes, 1, "  Hello\n");

    assert_node(&nodes, 2, PartType::Section, Some("section"));
    let section = &nodes[2];
    // section, Name:, name, Comments:, comments, \n, inverted, Inverted text,
    // close-inverted, close-section == 10 nodes including itself.
    assert_eq!(section.children_count, 9);

    assert_node(&nodes, 3, PartType::StaticText, None);
    assert_content(&nodes, 3, "Name: ");
    assert_node(&nodes, 4, PartType::Interpolation, Some("name"));
    assert_node(&nodes, 5, PartType::StaticText, None);
    assert_content(&nodes, 5, "\nComments: ");
    assert_node(&nodes, 6, PartType::Unescaped, Some("comments"));
    assert_node(&nodes, 7, PartType::StaticText, None);
    assert_content(&nodes, 7, "\n");

    assert_node(&nodes, 8, PartType::InvertedSection, Some("inverted"));
    assert_eq!(nodes[8].children_count, 2);
    assert_node(&nodes, 9, PartType::StaticText, None);
    assert_content(&nodes, 9, "Inverted text");
    assert_node(&nodes, 10, PartType::CloseSection, Some("inverted"));
    assert_node(&nodes, 11, PartType::CloseSection, Some("section"));

    assert_node(&nodes, 12, PartType::StaticText, None);
    assert_content(&nodes, 12, "World");
}

#[test]
fn streamed_mode_flushes_one_batch_per_standalone_root_line() {
    let source = "{{! Comments block }}\n  Hello\n  {{#section}}\nName: {{name}}\n{{/section}}\nWorld";
    let mut parser = Parser::from_reader(
        std::io::Cursor::new(source.as_bytes().to_vec()),
        ParserConfig::default(),
        ReaderConfig::new(4096),
    )
    .unwrap();

    let mut batches = Vec::new();
    while let Some(batch) = parser.next_batch().unwrap() {
        batches.push(batch);
    }

    assert_eq!(batches.len(), 3);
    assert_node(&batches[0], 0, PartType::Comment, None);

    assert_node(&batches[1], 0, PartType::StaticText, None);
    assert_content(&batches[1], 0, "  Hello\n");
    assert_node(&batches[1], 1, PartType::Section, Some("section"));

    assert_node(&batches[2], 0, PartType::StaticText, None);
    assert_content(&batches[2], 0, "World");
}

#[test]
fn standalone_comment_trims_its_whole_line_and_interior() {
    // The three leading spaces before `{{!` form their own static-text node
    // (pure whitespace, so its own left edge is never trimmed); once the
    // comment proves the line standalone, that node's *content* is trimmed
    // away to nothing, but the node itself is kept as an empty anchor
    // rather than spliced out of the arena — the same arena-position
    // contract `standalone_partial_captures_preceding_indentation` relies
    // on below.
    let source = "   {{!           \n   Comments block \n   }}            \nHello";
    let nodes = parse(source);
    assert_eq!(nodes.len(), 3);
    assert_node(&nodes, 0, PartType::StaticText, None);
    assert_content(&nodes, 0, "");
    assert_node(&nodes, 1, PartType::Comment, None);
    assert_node(&nodes, 2, PartType::StaticText, None);
    assert_content(&nodes, 2, "Hello");
}

#[test]
fn delimiter_change_updates_subsequent_tags() {
    let source = "{{=[ ]=}}           \n[interpolation]";
    let nodes = parse(source);
    assert_eq!(nodes.len(), 2);
    assert_node(&nodes, 0, PartType::Delimiters, None);
    assert_eq!(nodes[0].optional_delimiters.as_ref().unwrap().start(), "[");
    assert_eq!(nodes[0].optional_delimiters.as_ref().unwrap().end(), "]");
    assert_node(&nodes, 1, PartType::Interpolation, Some("interpolation"));
}

#[test]
fn nested_lambda_inner_text_is_captured_per_section() {
    let source = "{{#section1}}begin_content1{{#section2}}content2{{/section2}}end_content1{{/section1}}";
    let nodes = parse_with_lambdas(source);

    let section1 = nodes.iter().find(|n| n.part_type == PartType::Section && n.identifier.as_ref().unwrap().as_str() == "section1").unwrap();
    assert_eq!(
        section1.optional_inner_text.as_ref().unwrap().as_str(),
        "begin_content1{{#section2}}content2{{/section2}}end_content1"
    );

    let section2 = nodes.iter().find(|n| n.part_type == PartType::Section && n.identifier.as_ref().unwrap().as_str() == "section2").unwrap();
    assert_eq!(section2.optional_inner_text.as_ref().unwrap().as_str(), "content2");
}

#[test]
fn missing_close_delimiter_surfaces_positioned_error() {
    // Spec.md §8 scenario 6: a tag that never finds its ending delimiter
    // before EOF is `UnexpectedEof`, not `EndingDelimiterMismatch` (which is
    // reserved for a triple-mustache tag missing only its extra brace).
    let err = Parser::from_str("{{tag1", ParserConfig::default()).unwrap().parse().unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::UnexpectedEof);
    assert_eq!(err.line, 1);
}

#[test]
fn unclosed_section_surfaces_unexpected_eof() {
    let err = Parser::from_str("{{#section}}stuff", ParserConfig::default()).unwrap().parse().unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::UnexpectedEof);
}

#[test]
fn mismatched_close_identifier_is_rejected() {
    let err = Parser::from_str("{{#a}}x{{/b}}", ParserConfig::default()).unwrap().parse().unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::ClosingTagMismatch);
}

#[test]
fn close_without_open_is_rejected() {
    let err = Parser::from_str("{{/a}}", ParserConfig::default()).unwrap().parse().unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::UnexpectedCloseSection);
}

#[test]
fn multi_token_identifier_is_rejected() {
    let err = Parser::from_str("{{a b}}", ParserConfig::default()).unwrap().parse().unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::InvalidIdentifier);
}

#[test]
fn empty_template_emits_no_nodes() {
    assert!(parse("").is_empty());
}

#[test]
fn whitespace_only_template_is_a_single_preserved_static_node() {
    let nodes = parse("   \t  ");
    assert_eq!(nodes.len(), 1);
    assert_content(&nodes, 0, "   \t  ");
}

#[test]
fn pure_static_text_round_trips_byte_for_byte() {
    let source = "just some plain text with no tags at all\nacross lines too";
    let nodes = parse(source);
    assert_eq!(nodes.len(), 1);
    assert_content(&nodes, 0, source);
}

#[test]
fn single_character_delimiters_are_honored() {
    let config = ParserConfig {
        delimiters: mustache_parser::Delimiters::new("[", "]").unwrap(),
        ..ParserConfig::default()
    };
    let nodes = Parser::from_str("a[x]b", config).unwrap().parse().unwrap();
    assert_eq!(nodes.len(), 3);
    assert_node(&nodes, 1, PartType::Interpolation, Some("x"));
}

#[test]
fn triple_mustache_is_always_double_brace_regardless_of_custom_delimiters() {
    // Per the design's preferred resolution (spec.md §9): triple-mustache is
    // always `{{{`/`}}}` even when the configured delimiters are custom, so
    // custom delimiters never shadow it.
    let config = ParserConfig {
        delimiters: mustache_parser::Delimiters::new("<%", "%>").unwrap(),
        ..ParserConfig::default()
    };
    let nodes = Parser::from_str("<%{x}%>", config).unwrap().parse().unwrap();
    assert_eq!(nodes.len(), 1);
    assert_node(&nodes, 0, PartType::Interpolation, Some("{x}"));
}

#[test]
fn delimiter_change_is_idempotent_across_repeats() {
    // The first tag is written under the default `{{ }}` pair and switches
    // to `[ ]`; the second is already written under the new `[ ]` pair and
    // sets it to the same value again — a no-op change, not a second
    // literal `{{=...=}}` (which would no longer match anything once the
    // active delimiters are `[ ]`).
    let nodes = parse("{{=[ ]=}}[=[ ]=]text");
    assert_eq!(nodes.len(), 3);
    assert_node(&nodes, 0, PartType::Delimiters, None);
    assert_node(&nodes, 1, PartType::Delimiters, None);
    assert_node(&nodes, 2, PartType::StaticText, None);
    assert_content(&nodes, 2, "text");
}

#[test]
fn file_source_with_tiny_chunk_size_still_parses_correctly() {
    let source = "Hello {{#section}}\nName: {{name}}\n{{/section}}\nWorld {{{raw}}}";
    let cached = parse(source);

    let mut streamed_nodes = Vec::new();
    let mut parser = Parser::from_reader(
        std::io::Cursor::new(source.as_bytes().to_vec()),
        ParserConfig::default(),
        ReaderConfig::new(8),
    )
    .unwrap();
    while let Some(batch) = parser.next_batch().unwrap() {
        streamed_nodes.extend(batch);
    }

    assert_eq!(cached.len(), streamed_nodes.len());
    for (a, b) in cached.iter().zip(streamed_nodes.iter()) {
        assert_eq!(a.part_type, b.part_type);
        assert_eq!(a.text_part.content.as_bytes(), b.text_part.content.as_bytes());
    }
}

#[test]
fn standalone_partial_captures_preceding_indentation() {
    // "  {{>partial}}\n": the two leading spaces are not literal content,
    // they are indentation a renderer must repeat on every line of the
    // inserted partial, so they travel on the partial node's own
    // `indentation` field instead of staying in the preceding static-text
    // node (which, being entirely whitespace, is trimmed away to nothing).
    let nodes = parse("  {{>partial}}\n");
    assert_eq!(nodes.len(), 3);
    assert_node(&nodes, 0, PartType::StaticText, None);
    assert_content(&nodes, 0, "");
    assert_node(&nodes, 1, PartType::Partial, Some("partial"));
    assert_eq!(nodes[1].text_part.indentation.as_ref().unwrap().as_str(), "  ");
    assert_node(&nodes, 2, PartType::StaticText, None);
    assert_content(&nodes, 2, "");
}

#[test]
fn chained_standalone_tags_on_one_line_all_receive_the_indentation() {
    // "  {{!c}}{{>partial}}\n": two standalone-eligible tags share the same
    // indented line with no static text between them. The indentation must
    // reach both, not just the first one the trim lookback touches.
    let nodes = parse("  {{!c}}{{>partial}}\n");
    assert_eq!(nodes.len(), 4);
    assert_node(&nodes, 0, PartType::StaticText, None);
    assert_content(&nodes, 0, "");
    assert_node(&nodes, 1, PartType::Comment, None);
    assert_eq!(nodes[1].text_part.indentation.as_ref().unwrap().as_str(), "  ");
    assert_node(&nodes, 2, PartType::Partial, Some("partial"));
    assert_eq!(nodes[2].text_part.indentation.as_ref().unwrap().as_str(), "  ");
    assert_node(&nodes, 3, PartType::StaticText, None);
    assert_content(&nodes, 3, "");
}

#[test]
fn parent_block_tree_drops_stray_text_outside_nested_blocks() {
    // Text directly inside a `parent` tag, outside any nested `block`,
    // carries no meaning (spec.md §4.4) and is dropped rather than
    // appended as a node; the block's own content is kept.
    let source = "{{<parent}}{{$block}}override{{/block}}stray{{/parent}}";
    let nodes = parse(source);

    assert_eq!(nodes.len(), 5);
    assert_node(&nodes, 0, PartType::Parent, Some("parent"));
    assert_eq!(nodes[0].children_count, 4);
    assert_node(&nodes, 1, PartType::Block, Some("block"));
    assert_eq!(nodes[1].children_count, 2);
    assert_node(&nodes, 2, PartType::StaticText, None);
    assert_content(&nodes, 2, "override");
    assert_node(&nodes, 3, PartType::CloseSection, Some("block"));
    assert_node(&nodes, 4, PartType::CloseSection, Some("parent"));
}

#[test]
fn cached_mode_keeps_every_node_across_multiple_standalone_lines() {
    // Regression test: a root-level standalone line used to trigger the
    // streamed-mode arena flush unconditionally, discarding every node
    // parsed before it when driven through `parse()` instead of
    // `next_batch()`. Two standalone comments here each used to wipe out
    // everything parsed so far.
    let source = "{{! first }}\nKeep me\n{{! second }}\nAnd me";
    let nodes = parse(source);

    assert_node(&nodes, 0, PartType::Comment, None);
    assert_node(&nodes, 1, PartType::StaticText, None);
    assert_content(&nodes, 1, "Keep me\n");
    assert_node(&nodes, 2, PartType::Comment, None);
    assert_node(&nodes, 3, PartType::StaticText, None);
    assert_content(&nodes, 3, "And me");
    assert_eq!(nodes.len(), 4);
}

#[test]
fn ref_counted_buffer_is_released_once_all_node_handles_drop() {
    let source = "{{#a}}hello{{/a}}world".to_string();
    let mut parser = Parser::from_reader(
        std::io::Cursor::new(source.into_bytes()),
        ParserConfig::default(),
        ReaderConfig::new(4096),
    )
    .unwrap();
    let mut nodes = Vec::new();
    while let Some(batch) = parser.next_batch().unwrap() {
        nodes.extend(batch);
    }
    assert!(nodes.iter().any(|n| n.text_part.content.buffer_ref_count() >= 1));
    drop(nodes);
}
