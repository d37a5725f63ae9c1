//! End-to-end mapping of relational rows: parse a mapping file, resolve
//! it, run rows through it, and check the emitted triples.

use rdfmap::*;

const ALBUM_MAPPING: &str = r#"
PREFIX : <http://stardog.com/tutorial/>
PREFIX xsd: <http://www.w3.org/2001/XMLSchema#>

MAPPING <urn:albums>
FROM SQL {
  SELECT id, name, artist, release_date FROM Album
}
TO {
  ?subject a :Album ;
    :name ?name ;
    :artist ?artist_ref ;
    :date ?date .
}
WHERE {
  BIND(template("http://stardog.com/tutorial/Album{id}") AS ?subject)
  BIND(template("http://stardog.com/tutorial/Artist{artist}") AS ?artist_ref)
  BIND(xsd:date(?release_date) AS ?date)
}
"#;

fn album_rule() -> CompiledRule {
    let mut rules = parse_mapping(ALBUM_MAPPING).unwrap();
    assert_eq!(rules.len(), 1);
    rules.remove(0).resolve().unwrap()
}

fn album_row(id: &str, name: &str, artist: &str, date: Option<&str>) -> Row {
    let reader = SqlResultReader::new(vec![
        "id".to_string(),
        "name".to_string(),
        "artist".to_string(),
        "release_date".to_string(),
    ]);
    reader.row(vec![
        Some(id.to_string()),
        Some(name.to_string()),
        Some(artist.to_string()),
        date.map(str::to_string),
    ])
}

#[test]
fn test_album_row_produces_four_triples() {
    let rule = album_rule();
    let row = album_row("7", "Abbey Road", "1", Some("1969-09-26"));

    let triples = apply_rule(&rule, row).unwrap();
    assert_eq!(triples.len(), 4);

    let subject = "http://stardog.com/tutorial/Album7";
    for triple in &triples {
        assert_eq!(triple.subject.as_str(), subject);
    }

    let rendered: Vec<String> = triples.iter().map(|t| t.to_string()).collect();
    assert_eq!(
        rendered[0],
        format!(
            "<{}> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://stardog.com/tutorial/Album> .",
            subject
        )
    );
    assert_eq!(
        rendered[1],
        format!(
            "<{}> <http://stardog.com/tutorial/name> \"Abbey Road\" .",
            subject
        )
    );
    assert_eq!(
        rendered[2],
        format!(
            "<{}> <http://stardog.com/tutorial/artist> <http://stardog.com/tutorial/Artist1> .",
            subject
        )
    );
    assert_eq!(
        rendered[3],
        format!(
            "<{}> <http://stardog.com/tutorial/date> \"1969-09-26\"^^<http://www.w3.org/2001/XMLSchema#date> .",
            subject
        )
    );
}

#[test]
fn test_null_date_skips_only_that_triple() {
    let rule = album_rule();
    let row = album_row("7", "Abbey Road", "1", None);

    let triples = apply_rule(&rule, row).unwrap();
    assert_eq!(triples.len(), 3);
    assert!(triples
        .iter()
        .all(|t| t.predicate.as_str() != "http://stardog.com/tutorial/date"));
}

#[test]
fn test_invalid_date_fails_the_row() {
    let rule = album_rule();
    let row = album_row("7", "Abbey Road", "1", Some("sometime in 1969"));

    assert!(matches!(
        apply_rule(&rule, row),
        Err(EvalError::InvalidLexicalForm { expected, .. }) if expected == "date"
    ));
}

#[test]
fn test_batch_report_aggregates_row_failures() {
    let rule = album_rule();
    let rows = vec![
        album_row("1", "Please Please Me", "1", Some("1963-03-22")),
        album_row("2", "Bad Date", "1", Some("not-a-date")),
        album_row("3", "Help!", "1", Some("1965-08-06")),
    ];

    let (triples, report) = evaluate_rows(&rule, rows);

    assert_eq!(report.rows_in, 3);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].row_index, 1);
    assert_eq!(report.errors[0].rule.as_deref(), Some("urn:albums"));
    // the two good rows are unaffected
    assert_eq!(triples.len(), 8);
    assert_eq!(report.triples_out, 8);
}

#[test]
fn test_multiple_rules_apply_independently() {
    let text = r#"
PREFIX : <http://example.org/>

MAPPING albums
FROM SQL { SELECT * FROM Album }
TO { ?s a :Album . }
WHERE { BIND(template("http://example.org/album/{id}") AS ?s) } ;

MAPPING artists
FROM SQL { SELECT * FROM Artist }
TO { ?s a :Artist ; :name ?name . }
WHERE { BIND(template("http://example.org/artist/{id}") AS ?s) }
"#;
    let rules: Vec<CompiledRule> = parse_mapping(text)
        .unwrap()
        .into_iter()
        .map(|r| r.resolve().unwrap())
        .collect();
    assert_eq!(rules.len(), 2);

    let reader = SqlResultReader::new(vec!["id".to_string(), "name".to_string()]);
    let row = reader.row(vec![Some("9".to_string()), Some("The Beatles".to_string())]);

    let album_triples = apply_rule(&rules[0], row.clone()).unwrap();
    let artist_triples = apply_rule(&rules[1], row).unwrap();

    assert_eq!(album_triples.len(), 1);
    assert_eq!(
        album_triples[0].subject.as_str(),
        "http://example.org/album/9"
    );
    assert_eq!(artist_triples.len(), 2);
    assert_eq!(
        artist_triples[0].subject.as_str(),
        "http://example.org/artist/9"
    );
}

#[test]
fn test_concat_and_strdt_bindings() {
    let text = r#"
PREFIX : <http://example.org/>
PREFIX xsd: <http://www.w3.org/2001/XMLSchema#>

MAPPING
FROM SQL { SELECT * FROM People }
TO { ?s :fullName ?full ; :age ?age_typed . }
WHERE {
  BIND(template("http://example.org/person/{id}") AS ?s)
  BIND(concat(?first, " ", ?last) AS ?full)
  BIND(StrDt(?age, xsd:integer) AS ?age_typed)
}
"#;
    let rule = parse_mapping(text)
        .unwrap()
        .remove(0)
        .resolve()
        .unwrap();

    let reader = SqlResultReader::new(
        ["id", "first", "last", "age"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    );
    // null first name becomes the empty string in concat
    let row = reader.row(vec![
        Some("1".to_string()),
        None,
        Some("Lovelace".to_string()),
        Some("36".to_string()),
    ]);

    let triples = apply_rule(&rule, row).unwrap();
    let rendered: Vec<String> = triples.iter().map(|t| t.to_string()).collect();
    assert!(rendered[0].ends_with("<http://example.org/fullName> \" Lovelace\" ."));
    assert!(rendered[1].ends_with(
        "<http://example.org/age> \"36\"^^<http://www.w3.org/2001/XMLSchema#integer> ."
    ));
}

#[test]
fn test_forward_references_across_bindings() {
    // bindings may reference variables declared later in the block
    let text = r#"
MAPPING
FROM SQL { SELECT * FROM T }
TO { ?child <http://example.org/parent> ?parent . }
WHERE {
  BIND(template("{parent}/c/{id}") AS ?child)
  BIND(template("http://example.org/p/{pid}") AS ?parent)
}
"#;
    let rule = parse_mapping(text)
        .unwrap()
        .remove(0)
        .resolve()
        .unwrap();

    let reader = SqlResultReader::new(vec!["id".to_string(), "pid".to_string()]);
    let row = reader.row(vec![Some("3".to_string()), Some("8".to_string())]);

    let triples = apply_rule(&rule, row).unwrap();
    assert_eq!(
        triples[0].to_string(),
        "<http://example.org/p/8/c/3> <http://example.org/parent> <http://example.org/p/8> ."
    );
}
