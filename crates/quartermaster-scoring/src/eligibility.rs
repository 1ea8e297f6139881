//! Eligibility filter: is this item a legal candidate for this agent, and
//! may this agent auto-equip at all?
//!
//! Checks run in a fixed order and stop at the first failure, which is
//! reported as a typed rejection with a stable snake_case reason string.
//! Rejections are not errors; callers drop the candidate and move on.
//!
//! The filter also acts as the spatial index's [`Admission`] predicate,
//! applying only the checks that do not depend on any particular agent.

use std::fmt;

use quartermaster_index::Admission;
use quartermaster_types::{
    Agent, AgentId, EquipmentPolicy, Holder, Item, ItemId, LifeState,
};
use serde::Serialize;

use crate::config::EligibilityConfig;

/// Why an item is not a legal candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemRejection {
    /// The item no longer exists.
    Destroyed,
    /// The item is not in the agent's zone.
    WrongZone,
    /// The item's kind cannot be held as equipment.
    NotEquipment,
    /// Heavyweight kinds are never auto-equipped.
    Heavyweight,
    /// The agent's equipment policy does not allow the kind.
    DisallowedByPolicy,
    /// The item is forbidden to this agent.
    Forbidden,
    /// Biocoded to another agent.
    OwnerLocked,
    /// A research prerequisite is not complete.
    ResearchIncomplete,
    /// The item is on fire.
    Burning,
    /// Another agent holds the item.
    HeldByOther,
    /// The agent cannot reach the item.
    Unreachable,
    /// The agent cannot reserve the item.
    Unreservable,
    /// A rival agent holds an exclusive claim on the item.
    ClaimedByRival,
    /// The item is inside a container agents may not take from.
    UnapprovedContainer,
    /// The item is packed for transport.
    Packed,
    /// A registered predicate refused the item.
    Predicate {
        /// Name of the refusing predicate.
        name: &'static str,
    },
}

impl ItemRejection {
    /// Stable reason string for diagnostics.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Destroyed => "destroyed",
            Self::WrongZone => "wrong_zone",
            Self::NotEquipment => "not_equipment",
            Self::Heavyweight => "heavyweight",
            Self::DisallowedByPolicy => "disallowed_by_policy",
            Self::Forbidden => "forbidden",
            Self::OwnerLocked => "owner_locked",
            Self::ResearchIncomplete => "research_incomplete",
            Self::Burning => "burning",
            Self::HeldByOther => "held_by_other",
            Self::Unreachable => "unreachable",
            Self::Unreservable => "unreservable",
            Self::ClaimedByRival => "claimed_by_rival",
            Self::UnapprovedContainer => "unapproved_container",
            Self::Packed => "packed",
            Self::Predicate { .. } => "predicate",
        }
    }
}

impl fmt::Display for ItemRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Predicate { name } => write!(f, "predicate:{name}"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Why an agent may not auto-equip right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRejection {
    /// Not yet spawned into the world.
    NotSpawned,
    /// Dead.
    Dead,
    /// Downed and unable to act.
    Downed,
    /// Category of being is not eligible.
    IneligibleCategory,
    /// Travelling between zones.
    InTransit,
    /// Position is not finite.
    InvalidPosition,
    /// Cannot physically handle items.
    Incapable,
    /// Busy with an exclusive group duty.
    ExclusiveDuty,
    /// Younger than the configured minimum age.
    AgeGated,
    /// Role is left alone once armed.
    RoleExempt,
    /// Role may not auto-equip.
    RoleIneligible,
    /// A registered predicate refused the agent.
    Predicate {
        /// Name of the refusing predicate.
        name: &'static str,
    },
}

impl AgentRejection {
    /// Stable reason string for diagnostics.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotSpawned => "not_spawned",
            Self::Dead => "dead",
            Self::Downed => "downed",
            Self::IneligibleCategory => "ineligible_category",
            Self::InTransit => "in_transit",
            Self::InvalidPosition => "invalid_position",
            Self::Incapable => "incapable",
            Self::ExclusiveDuty => "exclusive_duty",
            Self::AgeGated => "age_gated",
            Self::RoleExempt => "role_exempt",
            Self::RoleIneligible => "role_ineligible",
            Self::Predicate { .. } => "predicate",
        }
    }
}

impl fmt::Display for AgentRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Predicate { name } => write!(f, "predicate:{name}"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// World facts the item checks need. Defaults are permissive.
pub trait EligibilityWorld {
    /// Whether `item` is forbidden to `agent`.
    fn is_forbidden(&self, _item: &Item, _agent: &Agent) -> bool {
        false
    }

    /// Whether research `project` is complete.
    fn research_complete(&self, _project: &str) -> bool {
        true
    }

    /// Whether `agent` can path to `item`.
    fn can_reach(&self, _agent: &Agent, _item: &Item) -> bool {
        true
    }

    /// Whether `agent` can reserve `item`.
    fn can_reserve(&self, _agent: &Agent, _item: &Item) -> bool {
        true
    }

    /// Agent holding an exclusive claim on `item`, if any.
    fn claimant(&self, _item: ItemId) -> Option<AgentId> {
        None
    }
}

/// An [`EligibilityWorld`] with every default.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenWorld;

impl EligibilityWorld for OpenWorld {}

/// Extra item check supplied by the host or a third-party extension.
pub trait ItemPredicate: Send + Sync + fmt::Debug {
    /// Name reported in [`ItemRejection::Predicate`].
    fn name(&self) -> &'static str;

    /// Whether `agent` may take `item`.
    fn allows(&self, agent: &Agent, item: &Item) -> bool;
}

/// Extra agent check supplied by the host or a third-party extension.
pub trait AgentPredicate: Send + Sync + fmt::Debug {
    /// Name reported in [`AgentRejection::Predicate`].
    fn name(&self) -> &'static str;

    /// Whether `agent` may auto-equip.
    fn allows(&self, agent: &Agent) -> bool;
}

/// Validates candidate items and agents.
#[derive(Debug, Default)]
pub struct EligibilityFilter {
    config: EligibilityConfig,
    item_predicates: Vec<Box<dyn ItemPredicate>>,
    agent_predicates: Vec<Box<dyn AgentPredicate>>,
}

impl EligibilityFilter {
    /// A filter with the given gating rules and no predicates.
    pub const fn new(config: EligibilityConfig) -> Self {
        Self {
            config,
            item_predicates: Vec::new(),
            agent_predicates: Vec::new(),
        }
    }

    /// Active gating rules.
    pub const fn config(&self) -> &EligibilityConfig {
        &self.config
    }

    /// Register an extra item check, run after the built-in ones.
    pub fn register_item_predicate(&mut self, predicate: Box<dyn ItemPredicate>) {
        self.item_predicates.push(predicate);
    }

    /// Register an extra agent check, run after the built-in ones.
    pub fn register_agent_predicate(&mut self, predicate: Box<dyn AgentPredicate>) {
        self.agent_predicates.push(predicate);
    }

    /// Check that `item` is a legal candidate for `agent`.
    ///
    /// # Errors
    ///
    /// Returns the first failed check as an [`ItemRejection`].
    pub fn validate_item(
        &self,
        item: &Item,
        agent: &Agent,
        policy: &EquipmentPolicy,
        world: &dyn EligibilityWorld,
    ) -> Result<(), ItemRejection> {
        if item.destroyed {
            return Err(ItemRejection::Destroyed);
        }
        if agent.zone != Some(item.zone) {
            return Err(ItemRejection::WrongZone);
        }
        if !item.def.equippable {
            return Err(ItemRejection::NotEquipment);
        }
        if item.def.heavyweight {
            return Err(ItemRejection::Heavyweight);
        }
        if !policy.allows(item.def.kind) {
            return Err(ItemRejection::DisallowedByPolicy);
        }
        if world.is_forbidden(item, agent) {
            return Err(ItemRejection::Forbidden);
        }
        if item.owner_lock.is_some_and(|owner| owner != agent.id) {
            return Err(ItemRejection::OwnerLocked);
        }
        if let Some(project) = item.def.research_prerequisite.as_deref()
            && !world.research_complete(project)
        {
            return Err(ItemRejection::ResearchIncomplete);
        }
        if item.burning {
            return Err(ItemRejection::Burning);
        }
        if item.held_by().is_some_and(|holder| holder != agent.id) {
            return Err(ItemRejection::HeldByOther);
        }
        if !world.can_reach(agent, item) {
            return Err(ItemRejection::Unreachable);
        }
        if !world.can_reserve(agent, item) {
            return Err(ItemRejection::Unreservable);
        }
        if world.claimant(item.id).is_some_and(|claimant| claimant != agent.id) {
            return Err(ItemRejection::ClaimedByRival);
        }
        match item.holder {
            Holder::Contained { approved: false } => {
                return Err(ItemRejection::UnapprovedContainer);
            }
            Holder::Packed => return Err(ItemRejection::Packed),
            Holder::OnGround | Holder::HeldBy { .. } | Holder::Contained { approved: true } => {}
        }
        if let Some(predicate) = self
            .item_predicates
            .iter()
            .find(|predicate| !predicate.allows(agent, item))
        {
            return Err(ItemRejection::Predicate {
                name: predicate.name(),
            });
        }
        Ok(())
    }

    /// Check that `agent` may auto-equip right now.
    ///
    /// # Errors
    ///
    /// Returns the first failed check as an [`AgentRejection`].
    pub fn validate_agent(&self, agent: &Agent) -> Result<(), AgentRejection> {
        match agent.life {
            LifeState::Unspawned => return Err(AgentRejection::NotSpawned),
            LifeState::Dead => return Err(AgentRejection::Dead),
            LifeState::Downed => return Err(AgentRejection::Downed),
            LifeState::Alive => {}
        }
        if !self.config.eligible_categories.contains(&agent.category) {
            return Err(AgentRejection::IneligibleCategory);
        }
        if agent.zone.is_none() {
            return Err(AgentRejection::InTransit);
        }
        if !agent.position.is_finite() {
            return Err(AgentRejection::InvalidPosition);
        }
        if !agent.can_manipulate {
            return Err(AgentRejection::Incapable);
        }
        if !self.config.allowed_duties.contains(&agent.duty) {
            return Err(AgentRejection::ExclusiveDuty);
        }
        if agent.age_years < self.config.min_age_years {
            return Err(AgentRejection::AgeGated);
        }
        if !self.config.eligible_roles.contains(&agent.role) {
            return Err(AgentRejection::RoleIneligible);
        }
        if agent.is_armed() && self.config.exempt_when_armed.contains(&agent.role) {
            return Err(AgentRejection::RoleExempt);
        }
        if let Some(predicate) = self
            .agent_predicates
            .iter()
            .find(|predicate| !predicate.allows(agent))
        {
            return Err(AgentRejection::Predicate {
                name: predicate.name(),
            });
        }
        Ok(())
    }

    /// The agent-independent subset of the item checks, used to decide what
    /// the spatial index tracks at all.
    pub fn admits_to_index(item: &Item) -> bool {
        !item.destroyed
            && item.def.equippable
            && !item.def.heavyweight
            && matches!(
                item.holder,
                Holder::OnGround | Holder::Contained { approved: true }
            )
    }
}

impl Admission for EligibilityFilter {
    fn admits(&self, item: &Item) -> bool {
        Self::admits_to_index(item)
    }
}

#[cfg(test)]
mod tests {
    use quartermaster_types::{
        AgentCategory, AgentRole, GroupDuty, ItemDef, ItemId, Position, ZoneId,
    };

    use super::*;

    #[derive(Debug)]
    struct NoKnives;

    impl ItemPredicate for NoKnives {
        fn name(&self) -> &'static str {
            "no_knives"
        }

        fn allows(&self, _agent: &Agent, item: &Item) -> bool {
            item.def.label != "knife"
        }
    }

    struct Claimed(AgentId);

    impl EligibilityWorld for Claimed {
        fn claimant(&self, _item: ItemId) -> Option<AgentId> {
            Some(self.0)
        }
    }

    fn setup() -> (Agent, Item) {
        let zone = ZoneId::new();
        (
            Agent::new(zone, Position::default()),
            Item::new(ItemDef::melee("knife", 8.0, 1.2), zone, Position::new(3.0, 4.0)),
        )
    }

    fn check(filter: &EligibilityFilter, item: &Item, agent: &Agent) -> Result<(), ItemRejection> {
        filter.validate_item(item, agent, &EquipmentPolicy::allow_all(), &OpenWorld)
    }

    #[test]
    fn plain_item_passes() {
        let (agent, item) = setup();
        let filter = EligibilityFilter::default();
        assert_eq!(check(&filter, &item, &agent), Ok(()));
        assert_eq!(filter.validate_agent(&agent), Ok(()));
    }

    #[test]
    fn item_checks_report_reasons() {
        let (agent, mut item) = setup();
        let filter = EligibilityFilter::default();

        item.burning = true;
        assert_eq!(check(&filter, &item, &agent), Err(ItemRejection::Burning));
        item.burning = false;

        item.holder = Holder::HeldBy {
            agent: AgentId::new(),
        };
        assert_eq!(check(&filter, &item, &agent), Err(ItemRejection::HeldByOther));

        item.holder = Holder::Contained { approved: false };
        assert_eq!(
            check(&filter, &item, &agent),
            Err(ItemRejection::UnapprovedContainer)
        );

        item.holder = Holder::Packed;
        assert_eq!(check(&filter, &item, &agent).map_err(ItemRejection::as_str), Err("packed"));

        item.holder = Holder::OnGround;
        item.zone = ZoneId::new();
        assert_eq!(check(&filter, &item, &agent), Err(ItemRejection::WrongZone));
    }

    #[test]
    fn policy_and_claims_reject() {
        let (agent, item) = setup();
        let filter = EligibilityFilter::default();
        assert_eq!(
            filter.validate_item(&item, &agent, &EquipmentPolicy::deny_all(), &OpenWorld),
            Err(ItemRejection::DisallowedByPolicy)
        );
        assert_eq!(
            filter.validate_item(
                &item,
                &agent,
                &EquipmentPolicy::allow_all(),
                &Claimed(AgentId::new())
            ),
            Err(ItemRejection::ClaimedByRival)
        );
        assert_eq!(
            filter.validate_item(&item, &agent, &EquipmentPolicy::allow_all(), &Claimed(agent.id)),
            Ok(())
        );
    }

    #[test]
    fn predicates_run_last_and_name_themselves() {
        let (agent, item) = setup();
        let mut filter = EligibilityFilter::default();
        filter.register_item_predicate(Box::new(NoKnives));
        let rejection = check(&filter, &item, &agent);
        assert_eq!(rejection, Err(ItemRejection::Predicate { name: "no_knives" }));
        assert_eq!(
            rejection.map_err(|r| r.to_string()),
            Err("predicate:no_knives".to_owned())
        );
    }

    #[test]
    fn agent_checks_report_reasons() {
        let (mut agent, _) = setup();
        let filter = EligibilityFilter::default();

        agent.life = LifeState::Downed;
        assert_eq!(filter.validate_agent(&agent), Err(AgentRejection::Downed));
        agent.life = LifeState::Alive;

        agent.category = AgentCategory::Mechanical;
        assert_eq!(
            filter.validate_agent(&agent),
            Err(AgentRejection::IneligibleCategory)
        );
        agent.category = AgentCategory::Sapient;

        agent.duty = GroupDuty::Caravan;
        assert_eq!(filter.validate_agent(&agent), Err(AgentRejection::ExclusiveDuty));
        agent.duty = GroupDuty::Defend;
        assert_eq!(filter.validate_agent(&agent), Ok(()));

        agent.age_years = 8;
        assert_eq!(filter.validate_agent(&agent), Err(AgentRejection::AgeGated));
        agent.age_years = 30;

        agent.role = AgentRole::Prisoner;
        assert_eq!(filter.validate_agent(&agent), Err(AgentRejection::RoleIneligible));

        agent.zone = None;
        assert_eq!(filter.validate_agent(&agent), Err(AgentRejection::InTransit));
    }

    #[test]
    fn exempt_roles_are_left_alone_once_armed() {
        let (mut agent, _) = setup();
        let mut config = EligibilityConfig::default();
        config.exempt_when_armed.insert(AgentRole::Guard);
        let filter = EligibilityFilter::new(config);

        agent.role = AgentRole::Guard;
        assert_eq!(filter.validate_agent(&agent), Ok(()));
        agent.held_item = Some(ItemId::new());
        assert_eq!(filter.validate_agent(&agent), Err(AgentRejection::RoleExempt));
    }

    #[test]
    fn index_admission_skips_held_and_heavy_items() {
        let (_, mut item) = setup();
        assert!(EligibilityFilter::admits_to_index(&item));
        item.holder = Holder::HeldBy {
            agent: AgentId::new(),
        };
        assert!(!EligibilityFilter::admits_to_index(&item));
        item.holder = Holder::Contained { approved: true };
        assert!(EligibilityFilter::admits_to_index(&item));
        item.def.heavyweight = true;
        assert!(!EligibilityFilter::admits_to_index(&item));
    }
}
