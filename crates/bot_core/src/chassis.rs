//! Chassis model: five mounting slots with allow-lists.
//!
//! Every operation is a pure transformation of an immutable snapshot;
//! callers decide whether to adopt the returned chassis.

use smallvec::SmallVec;

use crate::{Chassis, ComponentId, ComponentSpec, ComponentType, Slot, SlotId, SlotSpec};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacementError {
    UnknownSlot { slot: SlotId },
    TypeNotAllowed { slot: SlotId, kind: ComponentType },
    UnknownComponent { id: ComponentId },
    SlotLocked { slot: SlotId },
}

impl std::fmt::Display for PlacementError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownSlot { slot } => write!(f, "unknown slot '{slot}'"),
            Self::TypeNotAllowed { slot, kind } => {
                write!(f, "cannot install a {kind} component in the {slot} slot")
            }
            Self::UnknownComponent { id } => write!(f, "unknown component '{id}'"),
            Self::SlotLocked { slot } => write!(f, "the {slot} slot cannot be emptied"),
        }
    }
}

impl std::error::Error for PlacementError {}

impl Chassis {
    /// Builds the chassis from the content layout, resolving pre-installed
    /// component ids against the catalog. Unresolvable ids (an authoring
    /// error caught by content validation) leave the slot empty.
    pub fn from_slot_specs(specs: &[SlotSpec], catalog: &[ComponentSpec]) -> Self {
        let slots = specs
            .iter()
            .map(|spec| Slot {
                id: spec.id,
                allowed_types: spec.allowed_types.clone(),
                locked: spec.locked,
                installed: spec
                    .preinstalled
                    .as_ref()
                    .and_then(|id| catalog.iter().find(|c| c.id == *id))
                    .cloned(),
            })
            .collect();
        Self { slots }
    }

    pub fn slot(&self, slot_id: SlotId) -> Option<&Slot> {
        self.slots.iter().find(|slot| slot.id == slot_id)
    }

    /// Returns a chassis with `component` installed in `slot_id`, or an
    /// error leaving `self` untouched. Other slots are never affected.
    pub fn place(&self, slot_id: SlotId, component: ComponentSpec) -> Result<Self, PlacementError> {
        let index = self
            .slots
            .iter()
            .position(|slot| slot.id == slot_id)
            .ok_or(PlacementError::UnknownSlot { slot: slot_id })?;
        if !self.slots[index].allowed_types.contains(&component.kind) {
            return Err(PlacementError::TypeNotAllowed {
                slot: slot_id,
                kind: component.kind,
            });
        }
        let mut next = self.clone();
        next.slots[index].installed = Some(component);
        Ok(next)
    }

    /// Returns a chassis with `slot_id` emptied, unconditionally.
    /// Lock enforcement is the caller's responsibility.
    pub fn remove(&self, slot_id: SlotId) -> Self {
        let mut next = self.clone();
        if let Some(slot) = next.slots.iter_mut().find(|slot| slot.id == slot_id) {
            slot.installed = None;
        }
        next
    }

    pub fn has_component_of_type(&self, kind: ComponentType) -> bool {
        self.slots
            .iter()
            .any(|slot| slot.installed.as_ref().is_some_and(|c| c.kind == kind))
    }

    /// Slot ids currently holding a component of `kind`, in layout order.
    pub fn slots_of_type(&self, kind: ComponentType) -> SmallVec<[SlotId; 5]> {
        self.slots
            .iter()
            .filter(|slot| slot.installed.as_ref().is_some_and(|c| c.kind == kind))
            .map(|slot| slot.id)
            .collect()
    }

    /// Combined power consumption per step of all installed components.
    pub fn total_power_draw(&self) -> f32 {
        self.slots
            .iter()
            .filter_map(|slot| slot.installed.as_ref())
            .map(|component| component.power_per_step)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{base_content, catalog_spec};

    fn chassis() -> Chassis {
        let content = base_content();
        Chassis::from_slot_specs(&content.slots, &content.catalog)
    }

    #[test]
    fn place_then_read_yields_the_component() {
        let chassis = chassis();
        let motor = catalog_spec(&base_content(), "drive_motor");
        let next = chassis.place(SlotId::Left, motor.clone()).unwrap();
        assert_eq!(next.slot(SlotId::Left).unwrap().installed, Some(motor));
    }

    #[test]
    fn disallowed_type_leaves_chassis_unchanged() {
        let chassis = chassis();
        let motor = catalog_spec(&base_content(), "drive_motor");
        // The front slot does not accept motors.
        let err = chassis.place(SlotId::Front, motor).unwrap_err();
        assert_eq!(
            err,
            PlacementError::TypeNotAllowed {
                slot: SlotId::Front,
                kind: ComponentType::Motor,
            }
        );
        assert_eq!(chassis, self::chassis(), "rejection must not mutate");
    }

    #[test]
    fn place_does_not_touch_other_slots() {
        let content = base_content();
        let chassis = chassis();
        let motor = catalog_spec(&content, "drive_motor");
        let next = chassis.place(SlotId::Left, motor).unwrap();
        for slot_id in [SlotId::Center, SlotId::Front, SlotId::Back, SlotId::Right] {
            assert_eq!(
                next.slot(slot_id).unwrap().installed,
                chassis.slot(slot_id).unwrap().installed,
            );
        }
    }

    #[test]
    fn same_spec_may_occupy_left_and_right() {
        let content = base_content();
        let motor = catalog_spec(&content, "drive_motor");
        let chassis = chassis()
            .place(SlotId::Left, motor.clone())
            .unwrap()
            .place(SlotId::Right, motor)
            .unwrap();
        let motors = chassis.slots_of_type(ComponentType::Motor);
        assert_eq!(motors.as_slice(), [SlotId::Left, SlotId::Right]);
    }

    #[test]
    fn remove_clears_unconditionally() {
        // `remove` ignores the lock; only the action layer enforces it.
        let chassis = chassis().remove(SlotId::Center);
        assert!(chassis.slot(SlotId::Center).unwrap().installed.is_none());
        assert!(!chassis.has_component_of_type(ComponentType::Cpu));
    }

    #[test]
    fn total_power_draw_sums_installed_components() {
        let content = base_content();
        let chassis = chassis()
            .place(SlotId::Left, catalog_spec(&content, "drive_motor"))
            .unwrap()
            .place(SlotId::Front, catalog_spec(&content, "distance_sensor"))
            .unwrap();
        // cpu 0.1 + motor 2.5 + distance sensor 0.5
        assert!((chassis.total_power_draw() - 3.1).abs() < 1e-5);
    }

    #[test]
    fn empty_slots_draw_nothing() {
        let chassis = chassis().remove(SlotId::Center);
        assert!(chassis.total_power_draw().abs() < f32::EPSILON);
    }
}
