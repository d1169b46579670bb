// src/genomes.rs

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::info;

use crate::error::{Result, SequenceError};
use crate::genome_window::UcscClient;
use crate::models::{Chromosome, GenomeAssembly};

/// Assemblies keyed by organism ("Human", "Mouse", ...).
pub type GenomesByOrganism = BTreeMap<String, Vec<GenomeAssembly>>;

impl UcscClient {
    pub fn list_genomes(&self) -> Result<GenomesByOrganism> {
        info!("Fetching available genome assemblies");
        let body = self.api.get_json("/list/ucscGenomes", &[])?;
        group_genomes(&body)
    }

    pub fn list_chromosomes(&self, genome: &str) -> Result<Vec<Chromosome>> {
        info!("Fetching chromosomes for {}", genome);
        let body = self
            .api
            .get_json("/list/chromosomes", &[("genome", genome.to_string())])?;
        parse_chromosomes(&body)
    }
}

fn text_or<'a>(info: &'a Value, key: &str, fallback: &'a str) -> &'a str {
    info.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .unwrap_or(fallback)
}

fn truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        _ => false,
    }
}

pub fn group_genomes(body: &Value) -> Result<GenomesByOrganism> {
    let genomes = body
        .get("ucscGenomes")
        .and_then(Value::as_object)
        .ok_or_else(|| SequenceError::Service {
            message: "invalid genome data".to_string(),
        })?;

    let mut grouped = GenomesByOrganism::new();
    for (id, info) in genomes {
        let organism = text_or(info, "organism", "other").to_string();
        grouped.entry(organism).or_default().push(GenomeAssembly {
            id: id.clone(),
            name: text_or(info, "description", id).to_string(),
            source_name: text_or(info, "sourceName", id).to_string(),
            active: truthy(info.get("active")),
        });
    }
    Ok(grouped)
}

fn chromosome_rank(name: &str) -> (u8, u64, String) {
    let bare = name.strip_prefix("chr").unwrap_or(name);
    match bare {
        "X" => (1, 0, String::new()),
        "Y" => (2, 0, String::new()),
        "M" | "MT" => (3, 0, String::new()),
        _ => match bare.parse::<u64>() {
            Ok(n) => (0, n, String::new()),
            Err(_) => (4, 0, name.to_string()),
        },
    }
}

/// Primary chromosomes only (no `_alt`, `_random`, `Un_` contigs), in karyotype order.
pub fn parse_chromosomes(body: &Value) -> Result<Vec<Chromosome>> {
    let chromosomes = body
        .get("chromosomes")
        .and_then(Value::as_object)
        .ok_or_else(|| SequenceError::from_payload(body))?;

    let mut out: Vec<Chromosome> = chromosomes
        .iter()
        .filter(|(name, _)| !name.contains('_'))
        .map(|(name, size)| Chromosome {
            name: name.clone(),
            size: size.as_u64().unwrap_or(0),
        })
        .collect();
    out.sort_by_key(|c| chromosome_rank(&c.name));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn genomes_are_grouped_by_organism() {
        let body = json!({
            "ucscGenomes": {
                "hg38": {"organism": "Human", "description": "Dec. 2013 (GRCh38/hg38)",
                         "sourceName": "GRCh38", "active": 1},
                "hg19": {"organism": "Human", "description": "Feb. 2009 (GRCh37/hg19)", "active": 0},
                "xx1": {}
            }
        });
        let grouped = group_genomes(&body).unwrap();
        let human = &grouped["Human"];
        assert_eq!(human.len(), 2);
        let hg38 = human.iter().find(|g| g.id == "hg38").unwrap();
        assert!(hg38.active);
        assert_eq!(hg38.source_name, "GRCh38");
        let hg19 = human.iter().find(|g| g.id == "hg19").unwrap();
        assert!(!hg19.active);
        assert_eq!(hg19.source_name, "hg19");
        let other = &grouped["other"][0];
        assert_eq!(other.name, "xx1");
    }

    #[test]
    fn missing_listing_is_a_service_error() {
        let err = group_genomes(&json!({"error": "boom"})).unwrap_err();
        assert!(matches!(err, SequenceError::Service { .. }));
    }

    #[test]
    fn chromosomes_sorted_naturally_without_contigs() {
        let body = json!({
            "chromosomes": {
                "chr10": 133797422, "chrX": 156040895, "chr2": 242193529,
                "chrM": 16569, "chr1_KI270706v1_random": 175055, "chr1": 248956422,
                "chrY": 57227415
            }
        });
        let names: Vec<String> = parse_chromosomes(&body)
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, ["chr1", "chr2", "chr10", "chrX", "chrY", "chrM"]);
    }
}
