// Events the session pushes towards the presentation layer.
//
// The sim never talks to the UI. Feature callbacks and the session publish
// `UiEvent`s on a `UiFeed` (an `mpsc` sender); whatever draws the game owns
// the receiving end. A feed whose receiver is gone silently drops events, so
// headless sessions can simply drop the receiver.
//
// This is also where failure reasons become text: `StringId`s are resolved
// only when a popup is about to be shown.

use std::sync::mpsc::{self, Receiver, Sender};

use switchyard_sim::command::{Command, CommandSource};
use switchyard_sim::dispatch::Completion;
use switchyard_sim::flags::DoCommandFlags;
use switchyard_sim::strings::{self, INVALID_STRING_ID};
use switchyard_sim::types::{Money, TileIndex};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sound {
    Construction,
    Demolish,
    CashRegister,
    Splat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Window {
    TownDirectory,
    SignEditor,
    Finances,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UiEvent {
    PlaySound { sound: Sound, tile: TileIndex },
    OpenWindow(Window),
    ErrorPopup {
        command: Command,
        message: String,
        tile: TileIndex,
    },
    CostEstimate {
        command: Command,
        cost: Money,
        /// Why the previewed command would fail, if it would.
        error: Option<String>,
    },
    /// Session-level notice: players joining or leaving, desyncs.
    Notice(String),
}

#[derive(Clone, Debug)]
pub struct UiFeed {
    tx: Sender<UiEvent>,
}

impl UiFeed {
    /// A feed plus the receiver the presentation layer drains.
    pub fn channel() -> (Self, Receiver<UiEvent>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx }, rx)
    }

    pub fn emit(&self, event: UiEvent) {
        // Nobody listening is fine.
        let _ = self.tx.send(event);
    }

    pub fn notice(&self, text: impl Into<String>) {
        self.emit(UiEvent::Notice(text.into()));
    }

    /// Turn a finished request into UI feedback. Estimates show their cost.
    /// Failed attempts pop up an error only when the player issued them
    /// directly and did not ask for silence.
    pub fn report_completion(&self, completion: &Completion) {
        let command = completion.envelope.cmd;
        let result = &completion.result;
        if completion.estimate {
            self.emit(UiEvent::CostEstimate {
                command,
                cost: result.cost(),
                error: result.error_message().map(|id| describe(id).to_owned()),
            });
            return;
        }
        let Some(reason) = result.error_message() else {
            return;
        };
        if completion.envelope.source != CommandSource::SelfIssued
            || completion.flags.contains(DoCommandFlags::NO_ERROR_POPUP)
        {
            return;
        }
        self.emit(UiEvent::ErrorPopup {
            command,
            message: describe(reason).to_owned(),
            tile: completion.envelope.tile,
        });
    }
}

fn describe(id: strings::StringId) -> &'static str {
    if id == INVALID_STRING_ID {
        log::debug!(target: "switchyard::ui", "showing generic failure text");
    }
    strings::resolve(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchyard_sim::command::CommandEnvelope;
    use switchyard_sim::cost::CommandCost;
    use switchyard_sim::strings::ERROR_ALREADY_BUILT;
    use switchyard_sim::types::ExpensesType;

    fn completion(source: CommandSource, result: CommandCost, flags: DoCommandFlags) -> Completion {
        Completion {
            envelope: CommandEnvelope::new(Command::BuildRoad, TileIndex(7)).with_source(source),
            result,
            flags,
            estimate: false,
        }
    }

    #[test]
    fn failed_self_issued_request_pops_up() {
        let (feed, rx) = UiFeed::channel();
        feed.report_completion(&completion(
            CommandSource::SelfIssued,
            CommandCost::error(ERROR_ALREADY_BUILT),
            DoCommandFlags::empty(),
        ));
        assert_eq!(
            rx.try_recv().unwrap(),
            UiEvent::ErrorPopup {
                command: Command::BuildRoad,
                message: "Already built".into(),
                tile: TileIndex(7),
            }
        );
    }

    #[test]
    fn quiet_failures_do_not_pop_up() {
        let (feed, rx) = UiFeed::channel();
        let failed = CommandCost::error(ERROR_ALREADY_BUILT);
        feed.report_completion(&completion(CommandSource::Other, failed, DoCommandFlags::empty()));
        let remote = completion(CommandSource::Network, failed, DoCommandFlags::empty());
        feed.report_completion(&remote);
        feed.report_completion(&completion(
            CommandSource::SelfIssued,
            failed,
            DoCommandFlags::NO_ERROR_POPUP,
        ));
        feed.report_completion(&completion(
            CommandSource::SelfIssued,
            CommandCost::new(),
            DoCommandFlags::empty(),
        ));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn estimates_report_cost() {
        let (feed, rx) = UiFeed::channel();
        let mut done = completion(
            CommandSource::SelfIssued,
            CommandCost::with_cost(ExpensesType::Construction, 500),
            DoCommandFlags::QUERY_COST,
        );
        done.estimate = true;
        feed.report_completion(&done);
        assert_eq!(
            rx.try_recv().unwrap(),
            UiEvent::CostEstimate {
                command: Command::BuildRoad,
                cost: 500,
                error: None
            }
        );
    }

    #[test]
    fn dropped_receiver_is_harmless() {
        let (feed, rx) = UiFeed::channel();
        drop(rx);
        feed.notice("nobody home");
    }
}
