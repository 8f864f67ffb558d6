// Feature completion callbacks.
//
// Each feature registers its post-execution hooks here, once, before the
// session freezes the callback table. The hooks only talk to the UI feed;
// anything that changes the world belongs in a command handler so that every
// peer does it.
//
// Registration order fixes the `CallbackId`s, so every peer running the same
// build gets the same ids.

use switchyard_sim::callback::{CallbackError, CallbackId, CallbackRegistryBuilder};
use switchyard_sim::command::CommandEnvelope;
use switchyard_sim::cost::CommandCost;

use crate::ui::{Sound, UiEvent, UiFeed, Window};

/// Ids of the feature callbacks, for passing to `GameSession::request`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeatureCallbacks {
    pub build_road: CallbackId,
    pub remove_road: CallbackId,
    pub terraform: CallbackId,
    pub found_town: CallbackId,
    pub place_sign: CallbackId,
    pub give_money: CallbackId,
}

/// Register every feature callback on `builder`.
pub fn register_all(
    builder: &mut CallbackRegistryBuilder,
    ui: &UiFeed,
) -> Result<FeatureCallbacks, CallbackError> {
    Ok(FeatureCallbacks {
        build_road: on_success(builder, "road.built", ui, |ui, env| {
            ui.emit(UiEvent::PlaySound { sound: Sound::Construction, tile: env.tile });
        })?,
        remove_road: on_success(builder, "road.removed", ui, |ui, env| {
            ui.emit(UiEvent::PlaySound { sound: Sound::Demolish, tile: env.tile });
        })?,
        terraform: {
            let ui = ui.clone();
            let terraformed = move |res: &CommandCost, env: &CommandEnvelope| {
                // A failed terraform still gets audible feedback.
                let sound = if res.succeeded() {
                    Sound::Construction
                } else {
                    Sound::Splat
                };
                ui.emit(UiEvent::PlaySound { sound, tile: env.tile });
            };
            builder.register("landscape.terraformed", terraformed)?
        },
        found_town: on_success(builder, "town.founded", ui, |ui, env| {
            ui.emit(UiEvent::PlaySound { sound: Sound::Construction, tile: env.tile });
            ui.emit(UiEvent::OpenWindow(Window::TownDirectory));
        })?,
        place_sign: on_success(builder, "sign.placed", ui, |ui, _| {
            ui.emit(UiEvent::OpenWindow(Window::SignEditor));
        })?,
        give_money: on_success(builder, "company.money_given", ui, |ui, env| {
            ui.emit(UiEvent::PlaySound { sound: Sound::CashRegister, tile: env.tile });
            ui.emit(UiEvent::OpenWindow(Window::Finances));
        })?,
    })
}

/// Register a hook that runs only when the command succeeded.
fn on_success<F>(
    builder: &mut CallbackRegistryBuilder,
    name: &'static str,
    ui: &UiFeed,
    hook: F,
) -> Result<CallbackId, CallbackError>
where
    F: Fn(&UiFeed, &CommandEnvelope) + Send + Sync + 'static,
{
    let ui = ui.clone();
    builder.register(name, move |res: &CommandCost, env: &CommandEnvelope| {
        if res.succeeded() {
            hook(&ui, env);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchyard_sim::command::Command;
    use switchyard_sim::strings::ERROR_ALREADY_BUILT;
    use switchyard_sim::types::TileIndex;

    #[test]
    fn registers_each_feature_once() {
        let (ui, _rx) = UiFeed::channel();
        let mut builder = CallbackRegistryBuilder::new();
        let ids = register_all(&mut builder, &ui).unwrap();
        let registry = builder.build();
        assert_eq!(registry.len(), 6);
        assert_eq!(registry.id_of("town.founded"), Some(ids.found_town));
        assert!(register_all(&mut CallbackRegistryBuilder::new(), &ui).is_ok());
    }

    #[test]
    fn registering_twice_is_a_duplicate() {
        let (ui, _rx) = UiFeed::channel();
        let mut builder = CallbackRegistryBuilder::new();
        register_all(&mut builder, &ui).unwrap();
        assert!(matches!(
            register_all(&mut builder, &ui),
            Err(CallbackError::Duplicate("road.built"))
        ));
    }

    #[test]
    fn hooks_follow_the_result() {
        let (ui, rx) = UiFeed::channel();
        let mut builder = CallbackRegistryBuilder::new();
        let ids = register_all(&mut builder, &ui).unwrap();
        let registry = builder.build();
        let env = CommandEnvelope::new(Command::BuildRoad, TileIndex(9));

        registry.invoke(ids.build_road, &CommandCost::error(ERROR_ALREADY_BUILT), &env);
        assert!(rx.try_recv().is_err());

        registry.invoke(ids.build_road, &CommandCost::new(), &env);
        assert_eq!(
            rx.try_recv().unwrap(),
            UiEvent::PlaySound { sound: Sound::Construction, tile: TileIndex(9) }
        );

        registry.invoke(ids.terraform, &CommandCost::error(ERROR_ALREADY_BUILT), &env);
        assert_eq!(
            rx.try_recv().unwrap(),
            UiEvent::PlaySound { sound: Sound::Splat, tile: TileIndex(9) }
        );
    }
}
