use serde::{Deserialize, Deserializer};
use serde_json::{json, Map, Value};

use adflow_shared::error::Result;
use adflow_shared::fb::{AdsGateway, RemoteObject};
use adflow_shared::models::{Attributes, ConversionEvent, EventKind};

/// The flat field-level diff a caller submits. Everything optional; absent
/// fields are untouched.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct UpdateFields {
    #[serde(default)]
    pub campaign_name: Option<String>,
    #[serde(default)]
    pub campaign_type: Option<String>,
    #[serde(default)]
    pub campaign_objective: Option<String>,
    #[serde(default)]
    pub age_min: Option<u8>,
    #[serde(default)]
    pub age_max: Option<u8>,
    #[serde(default)]
    pub gender: Option<Vec<u8>>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub auto_expansion_level: Option<u32>,
    #[serde(default)]
    pub auto_expansion_status: Option<bool>,
    #[serde(default)]
    pub naming_convention: Option<String>,
    #[serde(default)]
    pub ad_optimization_level: Option<u32>,
    #[serde(default)]
    pub ad_optimization_status: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_event")]
    pub optimization_event: Option<ConversionEvent>,
    #[serde(default)]
    pub daily_budget: Option<i64>,
    #[serde(default)]
    pub cpa_goal: Option<i64>,
    #[serde(default)]
    pub exclusions: Option<Vec<Value>>,
    #[serde(default)]
    pub exclusions_added: Option<Vec<Value>>,
    #[serde(default)]
    pub exclusions_removed: Option<Vec<Value>>,
}

// Accepts both the structured form {"event": ..., "kind": ...} and the older
// two-element ["PURCHASE", "default"] tuple the frontend still sends.
fn deserialize_event<'de, D>(deserializer: D) -> std::result::Result<Option<ConversionEvent>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Wire {
        Structured(ConversionEvent),
        Tuple(String, EventKind),
    }

    Ok(Option::<Wire>::deserialize(deserializer)?.map(|wire| match wire {
        Wire::Structured(ev) => ev,
        Wire::Tuple(event, kind) => ConversionEvent::new(event, kind),
    }))
}

/// The caller's diff translated into per-resource change-sets: three local
/// attribute groups, the remote campaign params, the remote targeting
/// params, and the remote ad-set-level params.
#[derive(Clone, Debug, Default)]
pub struct ChangeSet {
    pub db_campaign: Attributes,
    pub db_expansion: Attributes,
    pub db_optimization: Attributes,
    pub fb_campaign: Attributes,
    pub fb_targeting: Attributes,
    pub fb_adset: Attributes,
}

impl ChangeSet {
    pub fn has_db_changes(&self) -> bool {
        !self.db_campaign.is_empty()
            || !self.db_expansion.is_empty()
            || !self.db_optimization.is_empty()
    }

    pub fn has_campaign_changes(&self) -> bool {
        !self.fb_campaign.is_empty()
    }

    pub fn has_adset_changes(&self) -> bool {
        !self.fb_adset.is_empty() || !self.fb_targeting.is_empty()
    }

    /// Ad-set-level params with targeting folded in, the shape merged into
    /// each ad set's exported state.
    pub fn adset_params(&self) -> Attributes {
        let mut params = self.fb_adset.clone();
        if !self.fb_targeting.is_empty() {
            params.insert(
                "targeting".to_string(),
                Value::Object(self.fb_targeting.clone()),
            );
        }
        params
    }
}

/// Recursively merges `src` into `dst`. Nested objects merge key by key;
/// everything else overwrites.
pub fn merge_objects(dst: &mut Map<String, Value>, src: &Map<String, Value>) {
    for (key, value) in src {
        match (dst.get_mut(key), value) {
            (Some(Value::Object(dst_inner)), Value::Object(src_inner)) => {
                merge_objects(dst_inner, src_inner);
            }
            _ => {
                dst.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Computes the new promoted object for an optimization-event change, using
/// the platform shape of the campaign's first ad set as the template. This
/// mis-derives for campaigns mixing pixel-based and mobile-app ad sets.
pub async fn promoted_object_for(
    gateway: &dyn AdsGateway,
    event: &ConversionEvent,
    user_os: Option<&Value>,
    application_id: Option<&Value>,
    object_store_url: Option<&Value>,
) -> Result<Attributes> {
    let app_id = application_id.cloned().unwrap_or(Value::Null);

    let value = match event.kind {
        EventKind::CustomEvent => json!({
            "pixel_id": app_id,
            "custom_event_type": "OTHER",
            "pixel_rule": {
                "event": {"eq": event.event},
            }
        }),
        EventKind::CustomConversion => {
            let conversion = gateway.get_object(&event.event, &["rule"]).await?;
            json!({
                "pixel_id": app_id,
                "custom_event_type": "OTHER",
                "pixel_rule": conversion.get("rule").cloned().unwrap_or(Value::Null),
            })
        }
        EventKind::Default => {
            let has_os = user_os.map(|os| match os {
                Value::Array(items) => !items.is_empty(),
                Value::Null => false,
                _ => true,
            });
            if has_os == Some(true) {
                json!({
                    "application_id": app_id,
                    "object_store_url": object_store_url.cloned().unwrap_or(Value::Null),
                    "custom_event_type": event.event,
                })
            } else {
                json!({
                    "custom_event_type": event.event,
                    "pixel_id": app_id,
                })
            }
        }
    };

    match value {
        Value::Object(map) => Ok(map),
        _ => unreachable!(),
    }
}

/// Translates the flat diff into the per-resource change-sets. Needs the
/// captured original ad sets because an `optimization_event` change derives
/// its promoted object from ad-set[0]'s current shape.
pub async fn collect_changes(
    gateway: &dyn AdsGateway,
    fields: &UpdateFields,
    original_adsets: &[RemoteObject],
) -> Result<ChangeSet> {
    let mut cs = ChangeSet::default();

    if let Some(name) = &fields.campaign_name {
        cs.db_campaign
            .insert("campaign_name".to_string(), json!(name));
        cs.fb_campaign.insert("name".to_string(), json!(name));
    }

    if let Some(campaign_type) = &fields.campaign_type {
        cs.db_campaign
            .insert("campaign_type".to_string(), json!(campaign_type));
    }

    if let Some(objective) = &fields.campaign_objective {
        cs.fb_campaign
            .insert("objective".to_string(), json!(objective));
    }

    if let Some(age_min) = fields.age_min {
        cs.fb_targeting.insert("age_min".to_string(), json!(age_min));
    }

    if let Some(age_max) = fields.age_max {
        cs.fb_targeting.insert("age_max".to_string(), json!(age_max));
    }

    if let Some(gender) = &fields.gender {
        cs.fb_targeting.insert("genders".to_string(), json!(gender));
    }

    if let Some(country) = &fields.country {
        cs.fb_targeting.insert(
            "geo_locations".to_string(),
            json!({
                "countries": [country],
                "cities": null,
            }),
        );
    }

    if let Some(level) = fields.auto_expansion_level {
        cs.db_expansion
            .insert("exp_number_of_ad_sets".to_string(), json!(level));
    }

    if let Some(status) = fields.auto_expansion_status {
        cs.db_campaign.insert("auto_expand".to_string(), json!(status));
        cs.db_expansion
            .insert("expansion_enabled".to_string(), json!(status));
    }

    if let Some(template) = &fields.naming_convention {
        cs.db_expansion
            .insert("exp_adset_name_template".to_string(), json!(template));
    }

    if let Some(level) = fields.ad_optimization_level {
        cs.db_optimization
            .insert("opt_number_of_ads".to_string(), json!(level));
    }

    if let Some(status) = fields.ad_optimization_status {
        cs.db_campaign.insert("ad_optimizer".to_string(), json!(status));
        cs.db_optimization
            .insert("optimization_enabled".to_string(), json!(status));
    }

    if let Some(event) = &fields.optimization_event {
        cs.db_campaign
            .insert("conversion_event".to_string(), serde_json::to_value(event)?);

        if let Some(reference) = original_adsets.first() {
            let promo = reference
                .get("promoted_object")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default();
            let app_id = promo.get("pixel_id").or_else(|| promo.get("application_id"));
            let object_store_url = promo.get("object_store_url");
            let user_os = reference
                .get("targeting")
                .and_then(|t| t.get("user_os"));

            let promoted_object =
                promoted_object_for(gateway, event, user_os, app_id, object_store_url).await?;
            cs.fb_adset.insert(
                "promoted_object".to_string(),
                Value::Object(promoted_object),
            );
        }
    }

    if let Some(budget) = fields.daily_budget {
        cs.db_campaign.insert("budget".to_string(), json!(budget));
        cs.fb_campaign
            .insert("daily_budget".to_string(), json!(budget));
    }

    if let Some(cpa_goal) = fields.cpa_goal {
        cs.db_campaign.insert("cpa_goal".to_string(), json!(cpa_goal));
    }

    let exclusions_changed = fields
        .exclusions_added
        .as_ref()
        .is_some_and(|e| !e.is_empty())
        || fields
            .exclusions_removed
            .as_ref()
            .is_some_and(|e| !e.is_empty());
    if exclusions_changed {
        cs.fb_targeting.insert(
            "excluded_custom_audiences".to_string(),
            json!(fields.exclusions.clone().unwrap_or_default()),
        );
    }

    Ok(cs)
}
