use crate::document::{ReportDocument, Summary};
use crate::records::{
    EnergySample, ImplementationItem, InfrastructureRow, Level, Metric, PolicyRecommendation,
    VehicleComparison,
};
use time::macros::date;

pub const DEFAULT_TITLE: &str = "New Energy Vehicle Policy Research Report - Hong Kong";

/// Illustrative seed content for a new report.
pub fn create_default_report() -> ReportDocument {
    ReportDocument::new(DEFAULT_TITLE)
        .with_summary(summary())
        .with_records(metrics())
        .with_records(nev_comparison())
        .with_records(infrastructure())
        .with_records(energy_consumption())
        .with_records(recommendations())
        .with_records(implementation())
}

fn summary() -> Summary {
    Summary {
        content: "This comprehensive study investigates the feasibility and implementation \
                  strategies for transitioning Hong Kong's transportation sector to New Energy \
                  Vehicles (NEVs), including electric vehicles (EVs) and hydrogen fuel cell \
                  vehicles (HFCVs). The research encompasses advantages and challenges of NEV \
                  adoption, AI-driven energy consumption analysis, infrastructure requirements, \
                  and policy recommendations to accelerate NEV adoption in Hong Kong."
            .into(),
        key_findings: vec![
            "EVs show 65% lower carbon emissions compared to ICE vehicles in Hong Kong's electricity grid mix".into(),
            "HFCVs demonstrate superior performance for heavy-duty applications with 40% reduction in refueling time".into(),
            "Infrastructure investment of HK$28.5 billion required for full NEV transition by 2035".into(),
            "Policy incentives could accelerate NEV adoption rate from 12% to 45% by 2030".into(),
        ],
    }
}

fn metric(label: &str, value: &str, trend: &str) -> Metric {
    Metric {
        label: label.into(),
        value: value.into(),
        trend: trend.into(),
    }
}

fn metrics() -> Vec<Metric> {
    vec![
        metric("Current NEV Adoption Rate", "12.3%", "+2.8%"),
        metric("CO2 Reduction Potential", "58%", "+15%"),
        metric("Infrastructure Readiness", "34%", "+8%"),
        metric("Policy Implementation Score", "67/100", "+12"),
    ]
}

fn nev_comparison() -> Vec<VehicleComparison> {
    [
        ("Small/Medium EVs", 85.0, 65.0, 78.0),
        ("Heavy-duty EVs", 72.0, 58.0, 65.0),
        ("Small/Medium HFCVs", 68.0, 72.0, 58.0),
        ("Heavy-duty HFCVs", 75.0, 68.0, 62.0),
        ("ICE Vehicles", 35.0, 0.0, 85.0),
    ]
    .into_iter()
    .map(|(t, e, c, k)| VehicleComparison {
        vehicle_type: t.into(),
        energy_efficiency: e,
        carbon_reduction: c,
        cost_effectiveness: k,
    })
    .collect()
}

fn infrastructure() -> Vec<InfrastructureRow> {
    [
        ("EV Charging Stations", 3200.0, 28000.0, 8.5),
        ("Fast Charging Hubs", 180.0, 2500.0, 12.2),
        ("Hydrogen Stations", 2.0, 150.0, 5.8),
        ("Grid Upgrades", 25.0, 100.0, 2.0),
    ]
    .into_iter()
    .map(|(t, current, required, inv)| InfrastructureRow {
        infrastructure_type: t.into(),
        current,
        required,
        investment_hkd: inv,
    })
    .collect()
}

fn energy_consumption() -> Vec<EnergySample> {
    [
        ("Jan", 42.5, 38.2, 85.6),
        ("Feb", 41.8, 37.9, 84.2),
        ("Mar", 43.2, 39.1, 86.1),
        ("Apr", 44.1, 39.8, 87.3),
        ("May", 45.3, 40.5, 88.9),
        ("Jun", 46.8, 41.2, 90.1),
    ]
    .into_iter()
    .map(|(m, ev, hfcv, ice)| EnergySample {
        month: m.into(),
        ev_consumption: ev,
        hfcv_consumption: hfcv,
        ice_consumption: ice,
    })
    .collect()
}

fn recommendations() -> Vec<PolicyRecommendation> {
    vec![
        PolicyRecommendation {
            title: "Accelerated EV Adoption Incentives".into(),
            description: "Implement comprehensive tax rebates up to HK$200,000 for EV purchases, \
                          coupled with reduced registration fees and priority parking privileges"
                .into(),
            priority: Level::High,
            timeline: "12 months".into(),
            budget: "HK$2.8 billion".into(),
            expected_impact: "Increase EV adoption by 25% within 2 years".into(),
        },
        PolicyRecommendation {
            title: "Hydrogen Infrastructure Development".into(),
            description: "Establish 150 hydrogen refueling stations across Hong Kong with \
                          government-private partnerships, focusing on commercial vehicle routes"
                .into(),
            priority: Level::High,
            timeline: "36 months".into(),
            budget: "HK$5.8 billion".into(),
            expected_impact: "Enable 40% of heavy-duty vehicles to transition to hydrogen".into(),
        },
        PolicyRecommendation {
            title: "Smart Grid Integration".into(),
            description: "Upgrade electricity grid to support bi-directional charging and \
                          renewable energy integration for NEV ecosystem"
                .into(),
            priority: Level::Medium,
            timeline: "48 months".into(),
            budget: "HK$2.0 billion".into(),
            expected_impact: "Reduce grid stress and enable V2G technology".into(),
        },
    ]
}

fn implementation() -> Vec<ImplementationItem> {
    vec![
        ImplementationItem {
            policy: "EV First Registration Tax Exemption".into(),
            status: "Active".into(),
            budget: "HK$1.2 billion".into(),
            impact: Level::High,
            completion: 85,
            target_date: date!(2024 - 12 - 31),
        },
        ImplementationItem {
            policy: "Public Charging Network Expansion".into(),
            status: "In Progress".into(),
            budget: "HK$800 million".into(),
            impact: Level::High,
            completion: 45,
            target_date: date!(2025 - 06 - 30),
        },
        ImplementationItem {
            policy: "Hydrogen Pilot Program".into(),
            status: "Planning".into(),
            budget: "HK$300 million".into(),
            impact: Level::Medium,
            completion: 15,
            target_date: date!(2025 - 12 - 31),
        },
    ]
}
