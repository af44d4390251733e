//! Demo vaccine cards inserted at start-up into an empty card collection.

use anyhow::Context;
use serde_json::{Value as JsonValue, json};
use tracing::info;

use evax_records::VaccineCard;

use crate::store::Repository;

fn dose(vaccine_name: &str, date_taken: &str, next_dose_date: Option<&str>) -> JsonValue {
    json!({
        "vaccine_name": vaccine_name,
        "doses": [{
            "vaccine_name": vaccine_name,
            "date_taken": date_taken,
            "next_dose_date": next_dose_date,
        }],
    })
}

fn demo_cards() -> JsonValue {
    json!([
        {
            "birth_id": "2024000001",
            "vaccines": [
                dose("BCG (Tuberculosis)", "2024-02-10", None),
                dose("OPV-0 (Polio 0 dose)", "2024-02-10", Some("2024-03-10")),
                dose("Hepatitis B Birth Dose", "2024-02-10", Some("2024-03-10")),
            ],
        },
        {
            "birth_id": "2024000002",
            "vaccines": [
                dose("Pentavalent-1 (DPT, HepB, Hib)", "2024-03-15", Some("2024-04-15")),
                dose("OPV-1 (Polio 1st Dose)", "2024-03-15", Some("2024-04-15")),
                dose("PCV-1 (Pneumococcal Vaccine)", "2024-03-15", Some("2024-04-15")),
            ],
        },
        {
            "birth_id": "2024000003",
            "vaccines": [
                dose("Measles-Rubella (MR-1)", "2024-08-10", Some("2025-02-10")),
            ],
        },
        { "birth_id": "2024000004", "vaccines": [] },
        {
            "birth_id": "2024000005",
            "vaccines": [
                dose("BCG", "2024-04-01", None),
                dose("OPV-0", "2024-04-01", Some("2024-05-01")),
            ],
        },
    ])
}

/// Insert the demo cards when no card exists yet. Returns how many were written.
pub async fn seed_demo_cards(cards: &Repository<VaccineCard>) -> anyhow::Result<usize> {
    if cards.count().await.context("counting vaccine cards")? > 0 {
        return Ok(0);
    }

    let demo: Vec<VaccineCard> =
        serde_json::from_value(demo_cards()).context("decoding demo vaccine cards")?;
    let total = demo.len();
    for mut card in demo {
        cards
            .upsert(&mut card)
            .await
            .with_context(|| format!("seeding vaccine card {}", card.birth_id()))?;
    }

    info!(cards = total, "demo vaccine cards seeded");
    Ok(total)
}
