//! Routing-rule rewrite for the panel's settings document.
//!
//! The settings document is manipulated as raw JSON so every key this tool
//! does not understand rides through the fetch → mutate → push cycle
//! untouched.

use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::collections::BTreeSet;

/// Rule discriminator the panel's proxy expects on routing rules.
const RULE_TYPE: &str = "field";

/// Deterministic preferred-route policy: the configured universe list is the
/// priority order, and its first currently-reachable entry wins.
pub fn preferred_route<'a>(
    universe: &'a [String],
    current: &BTreeSet<String>,
) -> Option<&'a str> {
    universe
        .iter()
        .find(|route| current.contains(route.as_str()))
        .map(String::as_str)
}

/// Rewrite `settings.routing.rules` so exactly one catch-all rule directs
/// the scoped users through `target`.
///
/// A rule survives when its outbound lies outside the managed universe, or
/// when it is domain-scoped (domain rules are never touched, whatever their
/// target). Every other catch-all targeting a managed route is dropped
/// before the replacement rule is appended, which makes the rewrite
/// idempotent. All other keys in the settings document pass through
/// unchanged.
pub fn reconcile(
    settings: &mut Value,
    target: &str,
    users: &[String],
    inbound_tags: &[String],
    universe: &[String],
) -> Result<()> {
    let rules = settings
        .get_mut("routing")
        .and_then(|routing| routing.get_mut("rules"))
        .and_then(Value::as_array_mut)
        .context("Settings document has no routing.rules array")?;

    rules.retain(|rule| keep_rule(rule, universe));
    rules.push(json!({
        "user": users,
        "outboundTag": target,
        "inboundTag": inbound_tags,
        "type": RULE_TYPE,
    }));

    Ok(())
}

fn keep_rule(rule: &Value, universe: &[String]) -> bool {
    if rule.get("domain").is_some() {
        return true;
    }
    match rule.get("outboundTag").and_then(Value::as_str) {
        Some(tag) => !universe.iter().any(|managed| managed == tag),
        // Rules without an outbound are not ours to manage.
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn universe() -> Vec<String> {
        vec!["hostip".into(), "docker".into()]
    }

    fn users() -> Vec<String> {
        vec!["home_ip".into(), "ss_home_ip".into()]
    }

    fn tags() -> Vec<String> {
        vec!["inbound-35833".into(), "inbound-443".into()]
    }

    fn settings_with_rules(rules: Value) -> Value {
        json!({
            "log": {"loglevel": "warning"},
            "routing": {"domainStrategy": "AsIs", "rules": rules},
            "outbounds": [{"tag": "direct", "protocol": "freedom"}],
        })
    }

    fn managed_rules(settings: &Value) -> Vec<&Value> {
        settings["routing"]["rules"]
            .as_array()
            .unwrap()
            .iter()
            .filter(|r| {
                r.get("domain").is_none()
                    && matches!(
                        r.get("outboundTag").and_then(Value::as_str),
                        Some("hostip" | "docker")
                    )
            })
            .collect()
    }

    #[test]
    fn preferred_route_follows_universe_order() {
        let current: BTreeSet<String> =
            ["docker".to_string(), "hostip".to_string()].into_iter().collect();
        assert_eq!(preferred_route(&universe(), &current), Some("hostip"));

        let only_docker: BTreeSet<String> = ["docker".to_string()].into_iter().collect();
        assert_eq!(preferred_route(&universe(), &only_docker), Some("docker"));
    }

    #[test]
    fn preferred_route_none_when_nothing_reachable() {
        assert_eq!(preferred_route(&universe(), &BTreeSet::new()), None);
    }

    #[test]
    fn appends_single_catch_all_rule() {
        let mut settings = settings_with_rules(json!([]));
        reconcile(&mut settings, "hostip", &users(), &tags(), &universe()).unwrap();

        let rules = settings["routing"]["rules"].as_array().unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(
            rules[0],
            json!({
                "user": ["home_ip", "ss_home_ip"],
                "outboundTag": "hostip",
                "inboundTag": ["inbound-35833", "inbound-443"],
                "type": "field",
            })
        );
    }

    #[test]
    fn domain_scoped_rule_with_managed_target_survives_unmodified() {
        let domain_rule = json!({
            "domain": ["geosite:cn"],
            "outboundTag": "hostip",
            "type": "field",
        });
        let mut settings = settings_with_rules(json!([domain_rule.clone()]));
        reconcile(&mut settings, "docker", &users(), &tags(), &universe()).unwrap();

        let rules = settings["routing"]["rules"].as_array().unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0], domain_rule);
    }

    #[test]
    fn catch_all_rule_with_managed_target_is_removed() {
        let mut settings = settings_with_rules(json!([
            {"user": ["home_ip"], "outboundTag": "docker", "type": "field"},
        ]));
        reconcile(&mut settings, "hostip", &users(), &tags(), &universe()).unwrap();

        let rules = settings["routing"]["rules"].as_array().unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0]["outboundTag"], "hostip");
    }

    #[test]
    fn catch_all_rule_with_foreign_target_is_retained() {
        let foreign = json!({"outboundTag": "blocked", "type": "field"});
        let mut settings = settings_with_rules(json!([foreign.clone()]));
        reconcile(&mut settings, "hostip", &users(), &tags(), &universe()).unwrap();

        let rules = settings["routing"]["rules"].as_array().unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0], foreign);
    }

    #[test]
    fn reconcile_twice_leaves_exactly_one_managed_catch_all() {
        let mut settings = settings_with_rules(json!([
            {"domain": ["geosite:ads"], "outboundTag": "blocked", "type": "field"},
        ]));

        reconcile(&mut settings, "hostip", &users(), &tags(), &universe()).unwrap();
        assert_eq!(managed_rules(&settings).len(), 1);

        reconcile(&mut settings, "docker", &users(), &tags(), &universe()).unwrap();
        let managed = managed_rules(&settings);
        assert_eq!(managed.len(), 1);
        assert_eq!(managed[0]["outboundTag"], "docker");
    }

    #[test]
    fn unknown_top_level_keys_are_preserved() {
        let mut settings = settings_with_rules(json!([]));
        settings["experimental"] = json!({"flag": true});

        reconcile(&mut settings, "hostip", &users(), &tags(), &universe()).unwrap();

        assert_eq!(settings["experimental"], json!({"flag": true}));
        assert_eq!(settings["log"]["loglevel"], "warning");
        assert_eq!(settings["routing"]["domainStrategy"], "AsIs");
    }

    #[test]
    fn missing_rules_array_is_an_error() {
        let mut settings = json!({"routing": {}});
        assert!(reconcile(&mut settings, "hostip", &users(), &tags(), &universe()).is_err());
    }
}
