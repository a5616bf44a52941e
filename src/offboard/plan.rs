//! Declarative deletion order for a tenant's rows.
//!
//! The plan is a topological order of the foreign-key graph below the tenant
//! row: every table appears before any table it references, and the tenant row
//! itself is last. Two tables are keyed by intermediate entities (newsletter
//! subscribers and pickups) whose ids are resolved once, before traversal.
use std::collections::{HashMap, HashSet};
use thiserror::Error;

use crate::database::TENANTS_TABLE;

/// An intermediate id set resolved from a tenant-owned table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeySet {
    Subscribers,
    Pickups,
}

impl KeySet {
    /// `(table, tenant column)` the ids are selected from.
    pub fn source(self) -> (&'static str, &'static str) {
        match self {
            KeySet::Subscribers => ("sell_local_newsletter_subscribers", "tenant_id"),
            KeySet::Pickups => ("sell_local_pickups", "tenant_id"),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            KeySet::Subscribers => "subscribers",
            KeySet::Pickups => "pickups",
        }
    }
}

/// How a rule's join column is matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Join column equals the tenant id.
    Direct,
    /// Join column is in a previously resolved id set.
    Via(KeySet),
}

impl Resolution {
    pub fn label(self) -> &'static str {
        match self {
            Resolution::Direct => "direct",
            Resolution::Via(KeySet::Subscribers) => "via subscribers",
            Resolution::Via(KeySet::Pickups) => "via pickups",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeletionRule {
    pub table: &'static str,
    pub column: &'static str,
    pub resolution: Resolution,
}

const fn direct(table: &'static str) -> DeletionRule {
    DeletionRule { table, column: "tenant_id", resolution: Resolution::Direct }
}

const fn via(table: &'static str, column: &'static str, set: KeySet) -> DeletionRule {
    DeletionRule { table, column, resolution: Resolution::Via(set) }
}

pub const KEY_SETS: &[KeySet] = &[KeySet::Subscribers, KeySet::Pickups];

pub const DELETION_RULES: &[DeletionRule] = &[
    // Newsletter sends reference subscribers
    via("sell_local_newsletter_sends", "subscriber_id", KeySet::Subscribers),
    direct("sell_local_newsletter_subscribers"),
    // Pickup products reference pickups and products
    via("sell_local_pickup_products", "pickup_id", KeySet::Pickups),
    direct("sell_local_pending_orders"),
    direct("sell_local_orders"),
    direct("sell_local_pickups"),
    direct("sell_local_recipe_purchases"),
    direct("sell_local_recipes"),
    direct("sell_local_menu_inventory"),
    direct("sell_local_menu_schedule"),
    direct("sell_local_categories"),
    direct("sell_local_products"),
    direct("sell_local_settings"),
    direct("sell_local_store_settings"),
    direct("sell_local_affiliate_links"),
    direct("sell_local_social_links"),
    direct("sell_local_hero_content"),
    direct("sell_local_about_content"),
    direct("sell_local_branding"),
    direct("sell_local_site_theme"),
    direct("sell_local_notification_banner"),
    direct("sell_local_audit_log"),
    DeletionRule { table: TENANTS_TABLE, column: "id", resolution: Resolution::Direct },
];

/// Known `(child, parent)` references between dependent tables. Every table
/// additionally references the tenant row, which the last-rule check covers.
pub const FOREIGN_KEYS: &[(&str, &str)] = &[
    ("sell_local_newsletter_sends", "sell_local_newsletter_subscribers"),
    ("sell_local_pickup_products", "sell_local_pickups"),
    ("sell_local_pickup_products", "sell_local_products"),
    ("sell_local_recipe_purchases", "sell_local_recipes"),
    ("sell_local_menu_inventory", "sell_local_products"),
    ("sell_local_categories", "sell_local_products"),
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("Deletion plan is empty")]
    Empty,

    #[error("Deletion plan must end with the tenant row (sell_local_tenants.id), found {0}")]
    TenantNotLast(String),

    #[error("Table {0} appears more than once in the deletion plan")]
    DuplicateTable(String),

    #[error("Table {table} uses the {set} key set, which is never resolved")]
    UnresolvedKeySet { table: String, set: &'static str },

    #[error("Key set {set} is resolved from {table}, which is not in the deletion plan")]
    KeySetSourceMissing { table: String, set: &'static str },

    #[error("Foreign key {child} -> {parent} references a table missing from the plan")]
    UnknownTable { child: String, parent: String },

    #[error("{child} must be deleted before {parent}")]
    OrderViolation { child: String, parent: String },
}

/// A validated deletion order.
#[derive(Debug, Clone)]
pub struct DeletionPlan {
    rules: Vec<DeletionRule>,
    key_sets: Vec<KeySet>,
}

impl DeletionPlan {
    /// The storefront schema's plan.
    pub fn standard() -> Result<Self, PlanError> {
        Self::new(DELETION_RULES, KEY_SETS, FOREIGN_KEYS)
    }

    pub fn new(
        rules: &[DeletionRule],
        key_sets: &[KeySet],
        foreign_keys: &[(&str, &str)],
    ) -> Result<Self, PlanError> {
        let last = rules.last().ok_or(PlanError::Empty)?;
        if last.table != TENANTS_TABLE || last.column != "id" || last.resolution != Resolution::Direct {
            return Err(PlanError::TenantNotLast(last.table.to_string()));
        }

        let mut position = HashMap::new();
        for (index, rule) in rules.iter().enumerate() {
            if position.insert(rule.table, index).is_some() {
                return Err(PlanError::DuplicateTable(rule.table.to_string()));
            }
        }

        let resolved: HashSet<KeySet> = key_sets.iter().copied().collect();
        for (index, rule) in rules.iter().enumerate() {
            if let Resolution::Via(set) = rule.resolution {
                if !resolved.contains(&set) {
                    return Err(PlanError::UnresolvedKeySet {
                        table: rule.table.to_string(),
                        set: set.name(),
                    });
                }
                // Rows keyed by the set reference its source table.
                let (source, _) = set.source();
                match position.get(source) {
                    None => {
                        return Err(PlanError::KeySetSourceMissing {
                            table: source.to_string(),
                            set: set.name(),
                        })
                    }
                    Some(&parent) if parent < index => {
                        return Err(PlanError::OrderViolation {
                            child: rule.table.to_string(),
                            parent: source.to_string(),
                        })
                    }
                    Some(_) => {}
                }
            }
        }

        for &(child, parent) in foreign_keys {
            match (position.get(child), position.get(parent)) {
                (Some(c), Some(p)) if c < p => {}
                (Some(_), Some(_)) => {
                    return Err(PlanError::OrderViolation {
                        child: child.to_string(),
                        parent: parent.to_string(),
                    })
                }
                _ => {
                    return Err(PlanError::UnknownTable {
                        child: child.to_string(),
                        parent: parent.to_string(),
                    })
                }
            }
        }

        Ok(Self {
            rules: rules.to_vec(),
            key_sets: key_sets.to_vec(),
        })
    }

    pub fn rules(&self) -> &[DeletionRule] {
        &self.rules
    }

    /// Id sets to resolve before the first rule runs.
    pub fn key_sets(&self) -> &[KeySet] {
        &self.key_sets
    }

    pub fn position(&self, table: &str) -> Option<usize> {
        self.rules.iter().position(|r| r.table == table)
    }
}
