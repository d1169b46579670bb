//! Blocking HTTP front end. One request is handled at a time; scale by
//! running more processes.

use std::collections::HashMap;
use std::io::Read;

use reqwest::Url;
use serde_json::{json, Value};
use tiny_http::{Header, Method, Request, Response, Server};
use tracing::{error, info, warn};

use sequence_retriever::UcscClient;

use crate::error::{AnalyzerError, Result};
use crate::models::{CalibrationParams, Variant};
use crate::prediction_tools::LikelihoodScorer;
use crate::single_variant::VariantAnalyzer;

pub struct App<'a> {
    pub ucsc: &'a UcscClient,
    pub scorer: &'a dyn LikelihoodScorer,
    pub window_size: u64,
    pub calibration: CalibrationParams,
}

fn error_body(e: &AnalyzerError) -> (u16, Value) {
    (e.http_status(), json!({ "error": e.to_string() }))
}

fn query_params(url: &Url) -> HashMap<String, String> {
    url.query_pairs().into_owned().collect()
}

/// Request parameters as strings, whether they came from the query or a JSON body.
fn analysis_params(url: &Url, body: &str) -> Result<HashMap<String, String>> {
    if url.query().is_some_and(|q| !q.is_empty()) || body.trim().is_empty() {
        return Ok(query_params(url));
    }
    let parsed: Value = serde_json::from_str(body)
        .map_err(|e| AnalyzerError::InvalidVariant(format!("request body is not JSON: {e}")))?;
    let object = parsed
        .as_object()
        .ok_or_else(|| AnalyzerError::InvalidVariant("request body must be a JSON object".into()))?;
    Ok(object
        .iter()
        .filter_map(|(k, v)| {
            let text = match v {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                _ => return None,
            };
            Some((k.clone(), text))
        })
        .collect())
}

fn required<'p>(params: &'p HashMap<String, String>, key: &str) -> Result<&'p str> {
    params
        .get(key)
        .map(String::as_str)
        .ok_or_else(|| AnalyzerError::InvalidVariant(format!("missing parameter '{key}'")))
}

fn variant_from_params(params: &HashMap<String, String>) -> Result<Variant> {
    let raw_position = required(params, "variant_position")?;
    let position = raw_position.trim().parse::<u64>().map_err(|_| {
        AnalyzerError::InvalidVariant(format!(
            "variant_position must be a positive integer, got {raw_position:?}"
        ))
    })?;
    Variant::new(
        position,
        required(params, "alternative")?,
        required(params, "chromosome")?,
        required(params, "genome")?,
    )
}

impl App<'_> {
    fn analyze(&self, url: &Url, body: &str) -> Result<Value> {
        let params = analysis_params(url, body)?;
        let variant = variant_from_params(&params)?;
        let analyzer = VariantAnalyzer {
            source: self.ucsc,
            scorer: self.scorer,
            window_size: self.window_size,
            calibration: self.calibration,
        };
        Ok(serde_json::to_value(analyzer.analyze(&variant)?)?)
    }

    fn genomes(&self, url: &Url) -> Result<Value> {
        let mut genomes = self.ucsc.list_genomes()?;
        if let Some(organism) = query_params(url).get("organism") {
            genomes.retain(|k, _| k == organism);
        }
        Ok(json!({ "genomes": genomes }))
    }

    fn chromosomes(&self, url: &Url) -> Result<Value> {
        let params = query_params(url);
        let genome = required(&params, "genome")?;
        Ok(json!({ "chromosomes": self.ucsc.list_chromosomes(genome)? }))
    }

    /// Routes one request and returns its status code and JSON body.
    pub fn handle(&self, method: &Method, raw_url: &str, body: &str) -> (u16, Value) {
        let url = match Url::parse("http://localhost").and_then(|base| base.join(raw_url)) {
            Ok(url) => url,
            Err(e) => return (400, json!({ "error": format!("bad request url: {e}") })),
        };

        let outcome = match (method, url.path()) {
            (Method::Post, "/analyze" | "/analyze_single_variant") => self.analyze(&url, body),
            (Method::Get, "/genomes") => self.genomes(&url),
            (Method::Get, "/chromosomes") => self.chromosomes(&url),
            (Method::Get, "/health") => Ok(json!({ "status": "ok" })),
            (_, "/analyze" | "/analyze_single_variant" | "/genomes" | "/chromosomes" | "/health") => {
                return (405, json!({ "error": format!("method {method} not allowed") }));
            }
            (_, path) => return (404, json!({ "error": format!("no route for {path}") })),
        };

        match outcome {
            Ok(value) => (200, value),
            Err(e) => {
                if e.http_status() >= 500 {
                    error!("{} {} failed: {}", method, raw_url, e);
                } else {
                    warn!("{} {} rejected: {}", method, raw_url, e);
                }
                error_body(&e)
            }
        }
    }

    fn respond(&self, mut request: Request) {
        let mut body = String::new();
        let (status, value) = match request.as_reader().read_to_string(&mut body) {
            Ok(_) => self.handle(request.method(), request.url(), &body),
            Err(e) => (400, json!({ "error": format!("unreadable request body: {e}") })),
        };
        info!("{} {} -> {}", request.method(), request.url(), status);

        let mut response = Response::from_string(value.to_string()).with_status_code(status);
        if let Ok(header) = Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]) {
            response = response.with_header(header);
        }
        if let Err(e) = request.respond(response) {
            warn!("Failed to send response: {}", e);
        }
    }

    /// Serves requests until the server is unblocked.
    pub fn run(&self, server: &Server) {
        for request in server.incoming_requests() {
            self.respond(request);
        }
        info!("Server stopped");
    }
}

pub fn bind(address: &str) -> Result<Server> {
    let server = Server::http(address).map_err(|e| {
        AnalyzerError::Io(std::io::Error::new(
            std::io::ErrorKind::AddrNotAvailable,
            format!("cannot bind {address}: {e}"),
        ))
    })?;
    info!("Listening on {}", address);
    Ok(server)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(raw: &str) -> Url {
        Url::parse("http://localhost").unwrap().join(raw).unwrap()
    }

    #[test]
    fn query_parameters_build_a_variant() {
        let u = url("/analyze?variant_position=43119628&alternative=g&genome=hg38&chromosome=chr17");
        let params = analysis_params(&u, "").unwrap();
        let v = variant_from_params(&params).unwrap();
        assert_eq!(v.position, 43119628);
        assert_eq!(v.alternate_allele, 'G');
        assert_eq!(v.chromosome, "chr17");
    }

    #[test]
    fn json_body_is_used_without_a_query() {
        let body = r#"{"variant_position": 43119628, "alternative": "G", "genome": "hg38", "chromosome": "chr17"}"#;
        let params = analysis_params(&url("/analyze"), body).unwrap();
        assert_eq!(params["variant_position"], "43119628");
        assert!(variant_from_params(&params).is_ok());
    }

    #[test]
    fn missing_or_malformed_parameters_are_bad_requests() {
        let params = analysis_params(&url("/analyze?alternative=G&genome=hg38&chromosome=chr17"), "").unwrap();
        assert_eq!(variant_from_params(&params).unwrap_err().http_status(), 400);

        let params = analysis_params(
            &url("/analyze?variant_position=-5&alternative=G&genome=hg38&chromosome=chr17"),
            "",
        )
        .unwrap();
        assert_eq!(variant_from_params(&params).unwrap_err().http_status(), 400);

        let err = analysis_params(&url("/analyze"), "[1, 2]").unwrap_err();
        assert_eq!(err.http_status(), 400);
    }

    #[test]
    fn position_beyond_genomic_range_is_a_bad_request() {
        let params = analysis_params(
            &url("/analyze?variant_position=18446744073709551615&alternative=G&genome=hg38&chromosome=chr17"),
            "",
        )
        .unwrap();
        assert_eq!(variant_from_params(&params).unwrap_err().http_status(), 400);
    }
}
