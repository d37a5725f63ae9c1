//! End-to-end mapping of JSON documents: shape extraction, array
//! fan-out, and scope rules for bindings and patterns.

use rdfmap::*;
use serde_json::json;

const BLOCK_MAPPING: &str = r#"
PREFIX : <http://api.stardog.com/>

MAPPING blocks
FROM JSON {
  {
    "hash": "?hash",
    "height": "?height",
    "txIndexes": ["?txIndex"]
  }
}
TO {
  ?block a :Block ;
    :hash ?hash ;
    :height ?height_int ;
    :includesTx ?tx .
  ?tx a :Tx ;
    :index ?txIndex .
}
WHERE {
  BIND(template("http://api.stardog.com/block#{hash}") AS ?block)
  BIND(template("http://api.stardog.com/tx#{txIndex}") AS ?tx)
  BIND(xsd:integer(?height) AS ?height_int)
}
"#;

fn block_rule() -> CompiledRule {
    parse_mapping(BLOCK_MAPPING)
        .unwrap()
        .remove(0)
        .resolve()
        .unwrap()
}

#[test]
fn test_array_fan_out_emits_one_triple_set_per_element() {
    let rule = block_rule();
    let doc = json!({
        "hash": "abc",
        "height": 100,
        "txIndexes": [5, 6]
    });

    let row = match &rule.rule().source {
        SourceSpec::Json { shape } => shape.extract(&doc).unwrap(),
        _ => unreachable!(),
    };
    let triples = apply_rule(&rule, row).unwrap();

    let rendered: Vec<String> = triples.iter().map(|t| t.to_string()).collect();
    let block = "http://api.stardog.com/block#abc";

    // block-level triples appear once
    assert!(rendered.contains(&format!(
        "<{}> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://api.stardog.com/Block> .",
        block
    )));
    assert!(rendered.contains(&format!(
        "<{}> <http://api.stardog.com/hash> \"abc\" .",
        block
    )));
    assert!(rendered.contains(&format!(
        "<{}> <http://api.stardog.com/height> \"100\"^^<http://www.w3.org/2001/XMLSchema#integer> .",
        block
    )));

    // array-scoped triples appear once per element
    for tx in ["5", "6"] {
        assert!(rendered.contains(&format!(
            "<{}> <http://api.stardog.com/includesTx> <http://api.stardog.com/tx#{}> .",
            block, tx
        )));
        assert!(rendered.contains(&format!(
            "<http://api.stardog.com/tx#{}> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://api.stardog.com/Tx> .",
            tx
        )));
        assert!(rendered.contains(&format!(
            "<http://api.stardog.com/tx#{}> <http://api.stardog.com/index> \"{}\" .",
            tx, tx
        )));
    }
    assert_eq!(triples.len(), 3 + 2 * 3);
}

#[test]
fn test_empty_array_keeps_block_triples() {
    let rule = block_rule();
    let doc = json!({ "hash": "abc", "height": 1, "txIndexes": [] });

    let row = match &rule.rule().source {
        SourceSpec::Json { shape } => shape.extract(&doc).unwrap(),
        _ => unreachable!(),
    };
    let triples = apply_rule(&rule, row).unwrap();

    // only the three block-level triples survive
    assert_eq!(triples.len(), 3);
    assert!(triples
        .iter()
        .all(|t| t.subject.as_str() == "http://api.stardog.com/block#abc"));
}

#[test]
fn test_missing_object_field_binds_null() {
    let rule = block_rule();
    let doc = json!({ "hash": "abc", "txIndexes": [1] });

    let row = match &rule.rule().source {
        SourceSpec::Json { shape } => shape.extract(&doc).unwrap(),
        _ => unreachable!(),
    };
    // ?height is null, so the xsd:integer cast propagates null and the
    // :height triple is skipped rather than failing the row
    let triples = apply_rule(&rule, row).unwrap();
    assert!(triples
        .iter()
        .all(|t| t.predicate.as_str() != "http://api.stardog.com/height"));
}

#[test]
fn test_nested_arrays_cross_product_with_ancestors() {
    let text = r#"
PREFIX : <http://example.org/>

MAPPING
FROM JSON {
  {
    "order": "?order",
    "items": [{
      "sku": "?sku",
      "tags": ["?tag"]
    }]
  }
}
TO {
  ?item :inOrder ?order_iri ;
    :tag ?tag .
}
WHERE {
  BIND(template("http://example.org/order/{order}") AS ?order_iri)
  BIND(template("http://example.org/item/{order}/{sku}") AS ?item)
}
"#;
    let rule = parse_mapping(text).unwrap().remove(0).resolve().unwrap();
    let doc = json!({
        "order": "o1",
        "items": [
            { "sku": "a", "tags": ["x", "y"] },
            { "sku": "b", "tags": ["z"] }
        ]
    });

    let row = match &rule.rule().source {
        SourceSpec::Json { shape } => shape.extract(&doc).unwrap(),
        _ => unreachable!(),
    };
    let triples = apply_rule(&rule, row).unwrap();
    let rendered: Vec<String> = triples.iter().map(|t| t.to_string()).collect();

    // one :inOrder per item, one :tag per (item, tag)
    assert_eq!(
        rendered
            .iter()
            .filter(|t| t.contains("inOrder"))
            .count(),
        2
    );
    assert!(rendered.contains(
        &"<http://example.org/item/o1/a> <http://example.org/tag> \"y\" .".to_string()
    ));
    assert!(rendered.contains(
        &"<http://example.org/item/o1/b> <http://example.org/tag> \"z\" .".to_string()
    ));
    assert_eq!(triples.len(), 2 + 3);
}

#[test]
fn test_sibling_arrays_cannot_be_joined() {
    // ?s and ?o live in sibling fan-out scopes; a pattern combining
    // them is rejected before any document is processed
    let text = r#"
MAPPING
FROM JSON {
  {
    "ins": ["?in"],
    "outs": ["?out"]
  }
}
TO { ?s <http://example.org/p> ?o . }
WHERE {
  BIND(template("http://example.org/{in}") AS ?s)
  BIND(template("http://example.org/{out}") AS ?o)
}
"#;
    let rule = parse_mapping(text).unwrap().remove(0);
    assert!(matches!(
        rule.resolve(),
        Err(RuleError::SiblingScopeJoin { .. })
    ));
}

#[test]
fn test_shape_mismatch_reported_per_document() {
    let rule = block_rule();
    // txIndexes is a scalar where the shape expects an array
    let doc = json!({ "hash": "abc", "height": 1, "txIndexes": 5 });

    match &rule.rule().source {
        SourceSpec::Json { shape } => {
            assert!(matches!(
                shape.extract(&doc),
                Err(ShapeError::ShapeMismatch { .. })
            ));
        }
        _ => unreachable!(),
    }
}

#[test]
fn test_unresolvable_variable_rejected_at_resolve_time() {
    let text = r#"
MAPPING
FROM JSON { { "id": "?id" } }
TO { ?s <http://example.org/p> ?nonexistent . }
WHERE { BIND(template("http://example.org/{id}") AS ?s) }
"#;
    let rule = parse_mapping(text).unwrap().remove(0);
    assert!(matches!(
        rule.resolve(),
        Err(RuleError::UnresolvableVariable(v)) if v == "nonexistent"
    ));
}
