//! Rate catalog: named ad categories with a base commission rate.
//!
//! Eligibility is descriptive text shown to partners; nothing here evaluates it.

use serde::{Deserialize, Serialize};

use crate::settings::RateSettings;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub base_rate: f64,
    pub description: String,
    pub eligibility: Vec<String>,
}

pub fn categories(settings: &RateSettings) -> Vec<Category> {
    vec![
        Category {
            name: "Standard Display".to_string(),
            base_rate: settings.standard_rate,
            description: "Banner and sidebar display placements".to_string(),
            eligibility: vec![
                "All verified partners".to_string(),
                "IAB standard ad sizes".to_string(),
            ],
        },
        Category {
            name: "Native Content".to_string(),
            base_rate: settings.standard_rate,
            description: "In-feed sponsored content matching site styling".to_string(),
            eligibility: vec![
                "All verified partners".to_string(),
                "Clear sponsored labelling".to_string(),
            ],
        },
        Category {
            name: "Video Pre-Roll".to_string(),
            base_rate: settings.premium_rate,
            description: "Skippable and non-skippable pre-roll video".to_string(),
            eligibility: vec![
                "Premium tier or above".to_string(),
                "Minimum 70% viewability".to_string(),
            ],
        },
        Category {
            name: "Premium Placement".to_string(),
            base_rate: settings.enterprise_rate,
            description: "Homepage takeovers and reserved inventory".to_string(),
            eligibility: vec![
                "Enterprise tier".to_string(),
                "Dedicated inventory commitment".to_string(),
                "Brand-safety review passed".to_string(),
            ],
        },
    ]
}

pub fn find_category<'a>(catalog: &'a [Category], name: &str) -> Option<&'a Category> {
    let name = name.trim();
    catalog.iter().find(|c| c.name.eq_ignore_ascii_case(name))
}
