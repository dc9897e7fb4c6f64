//! Company ↔ laboratory compatibility scoring

use serde::Serialize;
use std::collections::HashSet;

use crate::models::{Company, Laboratory};

const SPECIALTY_WEIGHT: f64 = 0.4;
const CERTIFICATION_WEIGHT: f64 = 0.25;
const LOCATION_WEIGHT: f64 = 0.15;
const CAPACITY_WEIGHT: f64 = 0.2;

/// Monthly analyses at which capacity counts as fully sufficient
const FULL_CAPACITY: f64 = 100.0;

#[derive(Debug, Clone, Serialize)]
pub struct MatchBreakdown {
    pub specialty: f64,
    pub certification: f64,
    pub location: f64,
    pub capacity: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LabMatch {
    pub laboratory_id: String,
    pub laboratory_name: String,
    /// Weighted sum in [0, 1]
    pub score: f64,
    pub breakdown: MatchBreakdown,
}

fn normalized(values: &[String]) -> HashSet<String> {
    values
        .iter()
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .collect()
}

/// Share of `wanted` covered by `offered`; 1.0 when nothing is wanted
fn coverage(wanted: &HashSet<String>, offered: &HashSet<String>) -> f64 {
    if wanted.is_empty() {
        return 1.0;
    }
    wanted.intersection(offered).count() as f64 / wanted.len() as f64
}

pub fn score_match(company: &Company, lab: &Laboratory) -> LabMatch {
    let specialty = coverage(&normalized(&company.needs), &normalized(&lab.specialties));
    let certification = coverage(
        &normalized(&company.certifications),
        &normalized(&lab.certifications),
    );
    let location = match (&company.state, &lab.state) {
        (Some(a), Some(b)) if a.eq_ignore_ascii_case(b) => 1.0,
        _ => 0.0,
    };
    let capacity = if lab.available {
        (lab.capacity as f64 / FULL_CAPACITY).min(1.0)
    } else {
        0.0
    };

    let score = SPECIALTY_WEIGHT * specialty
        + CERTIFICATION_WEIGHT * certification
        + LOCATION_WEIGHT * location
        + CAPACITY_WEIGHT * capacity;

    LabMatch {
        laboratory_id: lab.id.clone(),
        laboratory_name: lab.name.clone(),
        score: score.clamp(0.0, 1.0),
        breakdown: MatchBreakdown {
            specialty,
            certification,
            location,
            capacity,
        },
    }
}

/// Score every laboratory and return the best `limit`, highest first
pub fn rank_laboratories(company: &Company, labs: &[Laboratory], limit: usize) -> Vec<LabMatch> {
    let mut matches: Vec<LabMatch> = labs.iter().map(|lab| score_match(company, lab)).collect();
    matches.sort_by(|a, b| b.score.total_cmp(&a.score));
    matches.truncate(limit);
    matches
}
