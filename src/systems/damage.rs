use bevy::ecs::component::Mutable;
use bevy::ecs::message::MessageReader;
use bevy::prelude::*;

use crate::components::Damageable;
use crate::events::DamageEvent;

/// Deliver damage messages to every target carrying `T`.
///
/// Targets without `T` are skipped; the message is still visible to other
/// readers. Register once per damageable component type.
pub fn apply_damage<T>(mut damage: MessageReader<DamageEvent>, mut targets: Query<&mut T>)
where
    T: Component<Mutability = Mutable> + Damageable,
{
    for DamageEvent(intent) in damage.read() {
        let Ok(mut target) = targets.get_mut(intent.target) else {
            continue;
        };
        target.apply_damage(
            intent.damage,
            intent.origin,
            intent.point,
            intent.penetration_power,
        );
        debug!(
            "{:?} took {:.1} damage from {:?}",
            intent.target, intent.damage, intent.source
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::ecs::message::Messages;
    use crate::components::Health;
    use crate::types::DamageIntent;

    #[test]
    fn test_damage_reaches_health() {
        let mut app = App::new();
        app.add_message::<DamageEvent>();
        app.add_systems(Update, apply_damage::<Health>);

        let target = app.world_mut().spawn(Health::new(100.0)).id();
        let bystander = app.world_mut().spawn(Health::new(100.0)).id();
        let shooter = app.world_mut().spawn_empty().id();

        app.world_mut()
            .resource_mut::<Messages<DamageEvent>>()
            .write(DamageEvent(DamageIntent {
                target,
                source: shooter,
                damage: 40.0,
                origin: Vec3::ZERO,
                point: Vec3::NEG_Z,
                penetration_power: 1.0,
            }));
        app.update();

        let health = |entity| app.world().get::<Health>(entity).map(|h| h.current);
        assert_eq!(health(target), Some(60.0));
        assert_eq!(health(bystander), Some(100.0));
    }

    #[test]
    fn test_missing_target_is_ignored() {
        let mut app = App::new();
        app.add_message::<DamageEvent>();
        app.add_systems(Update, apply_damage::<Health>);

        let gone = app.world_mut().spawn_empty().id();
        app.world_mut().despawn(gone);
        app.world_mut()
            .resource_mut::<Messages<DamageEvent>>()
            .write(DamageEvent(DamageIntent {
                target: gone,
                source: gone,
                damage: 10.0,
                origin: Vec3::ZERO,
                point: Vec3::ZERO,
                penetration_power: 0.0,
            }));
        app.update();
    }
}
