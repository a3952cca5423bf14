//! Fields derived from a completed qualification.

use serde::{Deserialize, Serialize};

use super::answers::CurrentAnswers;
use super::question::QuestionKey;
use super::status::LeadStatus;
use crate::domain::parsing::{parse_budget, parse_dimensions, parse_location, Dimensions, ParsedLocation};

/// Size bucket by area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeCategory {
    Small,
    Medium,
    Large,
    XLarge,
}

impl SizeCategory {
    pub fn from_area_cm2(area: f64) -> Self {
        if area <= 50.0 {
            SizeCategory::Small
        } else if area <= 200.0 {
            SizeCategory::Medium
        } else if area <= 600.0 {
            SizeCategory::Large
        } else {
            SizeCategory::XLarge
        }
    }

    /// Typical price band for this size, in pence.
    pub fn price_estimate(&self) -> PriceEstimate {
        let (min_pence, max_pence) = match self {
            SizeCategory::Small => (8_000, 15_000),
            SizeCategory::Medium => (15_000, 35_000),
            SizeCategory::Large => (35_000, 80_000),
            SizeCategory::XLarge => (80_000, 200_000),
        };
        PriceEstimate { min_pence, max_pence }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SizeCategory::Small => "small",
            SizeCategory::Medium => "medium",
            SizeCategory::Large => "large",
            SizeCategory::XLarge => "xlarge",
        }
    }
}

/// Where the client is relative to the studio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionBucket {
    Local,
    Touring,
    Elsewhere,
    Flexible,
    Unknown,
}

impl RegionBucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegionBucket::Local => "local",
            RegionBucket::Touring => "touring",
            RegionBucket::Elsewhere => "elsewhere",
            RegionBucket::Flexible => "flexible",
            RegionBucket::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceEstimate {
    pub min_pence: i64,
    pub max_pence: i64,
}

/// Business rules applied when qualification completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualificationPolicy {
    pub min_budget_pence: i64,
    pub home_country: String,
    pub tour_countries: Vec<String>,
    pub tour_offers_enabled: bool,
}

/// Parsed and derived qualification data stored on the lead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Qualification {
    pub dimensions: Option<Dimensions>,
    pub budget_pence: Option<i64>,
    pub location: Option<ParsedLocation>,
    pub region: RegionBucket,
    pub size_category: Option<SizeCategory>,
    pub budget_below_minimum: bool,
    pub estimate: Option<PriceEstimate>,
}

impl Qualification {
    /// Where the lead goes once every question is answered.
    pub fn next_status(&self, policy: &QualificationPolicy) -> LeadStatus {
        if self.budget_below_minimum {
            LeadStatus::NeedsFollowUp
        } else if self.region == RegionBucket::Touring && policy.tour_offers_enabled {
            LeadStatus::TourOffered
        } else {
            LeadStatus::PendingApproval
        }
    }
}

/// Re-parses the structured answers and derives the bucketed fields.
pub fn derive_qualification(answers: &CurrentAnswers, policy: &QualificationPolicy) -> Qualification {
    let dimensions = answers.get(QuestionKey::Dimensions).and_then(parse_dimensions);
    let budget_pence = answers.get(QuestionKey::Budget).and_then(parse_budget);
    let location = answers.get(QuestionKey::Location).and_then(parse_location);

    let size_category = dimensions.map(|d| SizeCategory::from_area_cm2(d.area_cm2()));
    let region = region_for(location.as_ref(), policy);

    Qualification {
        dimensions,
        budget_pence,
        region,
        size_category,
        budget_below_minimum: budget_pence.map_or(false, |b| b < policy.min_budget_pence),
        estimate: size_category.map(|s| s.price_estimate()),
        location,
    }
}

fn region_for(location: Option<&ParsedLocation>, policy: &QualificationPolicy) -> RegionBucket {
    let Some(location) = location else {
        return RegionBucket::Unknown;
    };
    if location.flexible {
        return RegionBucket::Flexible;
    }
    match location.country.as_deref() {
        None => RegionBucket::Unknown,
        Some(country) if country.eq_ignore_ascii_case(&policy.home_country) => RegionBucket::Local,
        Some(country)
            if policy
                .tour_countries
                .iter()
                .any(|c| c.eq_ignore_ascii_case(country)) =>
        {
            RegionBucket::Touring
        }
        Some(_) => RegionBucket::Elsewhere,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{AnswerId, LeadId, Timestamp};
    use crate::domain::lead::answers::Answer;

    fn policy() -> QualificationPolicy {
        QualificationPolicy {
            min_budget_pence: 15_000,
            home_country: "United Kingdom".to_string(),
            tour_countries: vec!["Germany".to_string(), "France".to_string()],
            tour_offers_enabled: true,
        }
    }

    fn answers(pairs: &[(QuestionKey, &str)]) -> CurrentAnswers {
        let lead = LeadId::new();
        let now = Timestamp::now();
        let rows: Vec<Answer> = pairs
            .iter()
            .enumerate()
            .map(|(i, (key, text))| Answer {
                id: AnswerId::new(i as i64 + 1),
                lead_id: lead,
                question_key: *key,
                text: text.to_string(),
                created_at: now,
            })
            .collect();
        CurrentAnswers::from_answers(&rows)
    }

    #[test]
    fn size_buckets_by_area() {
        assert_eq!(SizeCategory::from_area_cm2(50.0), SizeCategory::Small);
        assert_eq!(SizeCategory::from_area_cm2(150.0), SizeCategory::Medium);
        assert_eq!(SizeCategory::from_area_cm2(600.0), SizeCategory::Large);
        assert_eq!(SizeCategory::from_area_cm2(601.0), SizeCategory::XLarge);
    }

    #[test]
    fn local_lead_with_budget_goes_to_approval() {
        let current = answers(&[
            (QuestionKey::Dimensions, "10x15cm"),
            (QuestionKey::Budget, "£400"),
            (QuestionKey::Location, "Leeds"),
        ]);
        let q = derive_qualification(&current, &policy());
        assert_eq!(q.region, RegionBucket::Local);
        assert_eq!(q.size_category, Some(SizeCategory::Medium));
        assert_eq!(q.estimate, Some(PriceEstimate { min_pence: 15_000, max_pence: 35_000 }));
        assert!(!q.budget_below_minimum);
        assert_eq!(q.next_status(&policy()), LeadStatus::PendingApproval);
    }

    #[test]
    fn low_budget_needs_follow_up() {
        let current = answers(&[(QuestionKey::Budget, "£80"), (QuestionKey::Location, "Berlin")]);
        let q = derive_qualification(&current, &policy());
        assert!(q.budget_below_minimum);
        assert_eq!(q.next_status(&policy()), LeadStatus::NeedsFollowUp);
    }

    #[test]
    fn touring_country_is_offered_a_tour() {
        let current = answers(&[(QuestionKey::Budget, "£400"), (QuestionKey::Location, "Paris")]);
        let q = derive_qualification(&current, &policy());
        assert_eq!(q.region, RegionBucket::Touring);
        assert_eq!(q.next_status(&policy()), LeadStatus::TourOffered);

        let disabled = QualificationPolicy {
            tour_offers_enabled: false,
            ..policy()
        };
        assert_eq!(q.next_status(&disabled), LeadStatus::PendingApproval);
    }

    #[test]
    fn other_regions() {
        let q = derive_qualification(&answers(&[(QuestionKey::Location, "Toronto")]), &policy());
        assert_eq!(q.region, RegionBucket::Elsewhere);

        let q = derive_qualification(&answers(&[(QuestionKey::Location, "anywhere")]), &policy());
        assert_eq!(q.region, RegionBucket::Flexible);

        let q = derive_qualification(&answers(&[(QuestionKey::Location, "Little Snoring")]), &policy());
        assert_eq!(q.region, RegionBucket::Unknown);
    }
}
