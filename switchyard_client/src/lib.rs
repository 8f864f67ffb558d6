// switchyard_client — headless game session for one Switchyard peer.
//
// Bridges the sim and the relay. A front end (renderer, bot, test harness)
// creates a `GameSession`, issues commands through it, calls `flush()` and
// `poll()` once per frame, and drains the `UiEvent` receiver. No rendering
// lives here.
//
// Module overview:
// - `session.rs`:    `GameSession`, offline or connected to a relay. Owns
//                    the world and the dispatcher, replays turns, reports
//                    checksums, fails pending requests on disconnect.
// - `callbacks.rs`:  Feature completion hooks (roads, terraforming, towns,
//                    signs, money), registered once per session.
// - `ui.rs`:         `UiFeed` / `UiEvent`: sounds, windows, error popups,
//                    cost estimates, notices.
//
// See also: `switchyard_sim` for everything deterministic,
// `switchyard_relay` for the transport.

pub mod callbacks;
pub mod session;
pub mod ui;

pub use callbacks::FeatureCallbacks;
pub use session::{GameSession, SessionError, company_for};
pub use ui::{UiEvent, UiFeed};
