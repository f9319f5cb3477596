use std::time::Duration;

use anyhow::{Context, Result};
use oxrdf::{Subject, Term};
use oxttl::TurtleParser;

use crate::location::Location;
use crate::rdf::RawTriple;

use super::http::HttpClient;
use super::{FetchFuture, TripleSource};

/// Reads Turtle or N-Triples documents from disk or over HTTP.
pub(crate) struct DocumentSource {
    http: HttpClient,
}

impl DocumentSource {
    pub(crate) fn new(timeout: Duration) -> Result<DocumentSource> {
        Ok(DocumentSource {
            http: HttpClient::new(timeout)?,
        })
    }
}

impl TripleSource for DocumentSource {
    fn fetch<'a>(&'a self, location: &'a str) -> FetchFuture<'a> {
        Box::pin(async move {
            match Location::parse(location)? {
                Location::Local(path) => {
                    let body = tokio::fs::read(&path)
                        .await
                        .with_context(|| format!("unable to read {}", path.display()))?;
                    parse_turtle(&body, None)
                }
                Location::Remote(url) => {
                    let body = self.http.fetch(&url).await?;
                    parse_turtle(&body, Some(&url))
                }
            }
        })
    }
}

/// Parse a Turtle document into raw triples. N-Triples is a subset of
/// Turtle, so both are accepted.
pub(crate) fn parse_turtle(body: &[u8], base_iri: Option<&str>) -> Result<Vec<RawTriple>> {
    let mut parser = TurtleParser::new();
    if let Some(base) = base_iri {
        parser = parser
            .with_base_iri(base)
            .with_context(|| format!("`{base}` is not a valid base IRI"))?;
    }
    let mut triples = Vec::new();
    for triple in parser.for_slice(body) {
        let triple = triple.context("invalid turtle document")?;
        triples.push(RawTriple::new(
            subject_value(triple.subject),
            triple.predicate.into_string(),
            object_value(triple.object),
        ));
    }
    Ok(triples)
}

fn subject_value(subject: Subject) -> String {
    match subject {
        Subject::NamedNode(node) => node.into_string(),
        other => other.to_string(),
    }
}

fn object_value(object: Term) -> String {
    match object {
        Term::NamedNode(node) => node.into_string(),
        Term::Literal(literal) => literal.value().to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::time::Duration;

    use anyhow::Result;

    use crate::fetch::TripleSource;
    use crate::rdf::RawTriple;

    use super::{DocumentSource, parse_turtle};

    const OBSERVATIONS: &str = r#"
@prefix sosa: <http://www.w3.org/ns/sosa/> .
@prefix xsd: <http://www.w3.org/2001/XMLSchema#> .

<obs/1> sosa:resultTime "2024-01-01T00:00:00Z"^^xsd:dateTime ;
    sosa:hasSimpleResult "21.5" ;
    sosa:hasFeatureOfInterest [ sosa:isSampleOf <room/1> ] .
"#;

    #[test]
    fn literals_keep_their_lexical_form() -> Result<()> {
        let triples = parse_turtle(OBSERVATIONS.as_bytes(), Some("http://example.org/"))?;
        assert_eq!(triples.len(), 4);
        assert_eq!(
            triples[0],
            RawTriple::new(
                "http://example.org/obs/1",
                "http://www.w3.org/ns/sosa/resultTime",
                "2024-01-01T00:00:00Z"
            )
        );
        assert_eq!(triples[1].object, "21.5");
        let blank = triples
            .iter()
            .find(|t| t.predicate.ends_with("isSampleOf"))
            .map(|t| t.subject.clone())
            .expect("nested object should be parsed");
        assert!(blank.starts_with("_:"));
        assert!(triples.iter().any(|t| t.object == blank));
        Ok(())
    }

    #[test]
    fn malformed_documents_are_errors() {
        assert!(parse_turtle(b"<a> <b> .", None).is_err());
        assert!(parse_turtle(b"<a> <b> <c> .", Some("not an iri")).is_err());
    }

    #[tokio::test]
    async fn reads_local_documents() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(
            file,
            "<http://example.org/a> <http://example.org/p> \"1\" ."
        )?;
        let path = file.path().to_string_lossy().to_string();
        let source = DocumentSource::new(Duration::from_secs(1))?;
        let triples = source.fetch(&path).await?;
        assert_eq!(
            triples,
            vec![RawTriple::new("http://example.org/a", "http://example.org/p", "1")]
        );
        assert!(source.fetch("/nonexistent/linkstream.ttl").await.is_err());
        Ok(())
    }
}
