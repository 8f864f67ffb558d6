// Display-string identifiers for command failure reasons.
//
// The command core never formats user-facing text. Failures carry a
// `StringId`, and the UI resolves it through `resolve()` at the very edge of
// the program (see `switchyard_client::ui`). Keeping ids numeric also keeps
// `CommandCost` `Copy` and cheap to compare in tests.
//
// `INVALID_STRING_ID` is the "no specific reason" id carried by `CMD_ERROR`;
// it resolves to a generic failure message.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a translatable display string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StringId(pub u16);

impl fmt::Display for StringId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(resolve(*self))
    }
}

pub const INVALID_STRING_ID: StringId = StringId(0xFFFF);

pub const ERROR_NOT_ENOUGH_CASH_REQUIRES_X: StringId = StringId(1);
pub const ERROR_NOT_ALLOWED_WHILE_PAUSED: StringId = StringId(2);
pub const ERROR_TOO_CLOSE_TO_EDGE_OF_MAP: StringId = StringId(3);
pub const ERROR_CAN_T_BUILD_ON_WATER: StringId = StringId(4);
pub const ERROR_MUST_REMOVE_ROAD_FIRST: StringId = StringId(5);
pub const ERROR_BUILDING_MUST_BE_DEMOLISHED: StringId = StringId(6);
pub const ERROR_ALREADY_BUILT: StringId = StringId(7);
pub const ERROR_THERE_IS_NO_ROAD: StringId = StringId(8);
pub const ERROR_OWNED_BY_ANOTHER_COMPANY: StringId = StringId(9);
pub const ERROR_START_AND_END_MUST_BE_IN_LINE: StringId = StringId(10);
pub const ERROR_ALREADY_AT_SEA_LEVEL: StringId = StringId(11);
pub const ERROR_TOO_HIGH: StringId = StringId(12);
pub const ERROR_SITE_UNSUITABLE: StringId = StringId(13);
pub const ERROR_TOO_CLOSE_TO_ANOTHER_TOWN: StringId = StringId(14);
pub const ERROR_NAME_MUST_BE_UNIQUE: StringId = StringId(15);
pub const ERROR_TOO_MANY_SIGNS: StringId = StringId(16);
pub const ERROR_TEXT_TOO_LONG: StringId = StringId(17);
pub const ERROR_CONNECTION_LOST: StringId = StringId(18);
pub const ERROR_ONLY_AVAILABLE_TO_HOST: StringId = StringId(19);
pub const ERROR_GIVE_MONEY_DISABLED: StringId = StringId(20);

/// English text for every known id. Ids are looked up linearly; the table is
/// small and only consulted when a message is shown.
static STRING_TABLE: &[(StringId, &str)] = &[
    (ERROR_NOT_ENOUGH_CASH_REQUIRES_X, "Not enough cash"),
    (
        ERROR_NOT_ALLOWED_WHILE_PAUSED,
        "Not allowed while the game is paused",
    ),
    (ERROR_TOO_CLOSE_TO_EDGE_OF_MAP, "Too close to edge of map"),
    (ERROR_CAN_T_BUILD_ON_WATER, "Can't build on water"),
    (ERROR_MUST_REMOVE_ROAD_FIRST, "Must remove road first"),
    (
        ERROR_BUILDING_MUST_BE_DEMOLISHED,
        "Building must be demolished first",
    ),
    (ERROR_ALREADY_BUILT, "Already built"),
    (ERROR_THERE_IS_NO_ROAD, "There is no road here"),
    (ERROR_OWNED_BY_ANOTHER_COMPANY, "Owned by another company"),
    (
        ERROR_START_AND_END_MUST_BE_IN_LINE,
        "Start and end must be in line",
    ),
    (ERROR_ALREADY_AT_SEA_LEVEL, "Already at sea level"),
    (ERROR_TOO_HIGH, "Too high"),
    (ERROR_SITE_UNSUITABLE, "Site unsuitable"),
    (
        ERROR_TOO_CLOSE_TO_ANOTHER_TOWN,
        "Too close to another town",
    ),
    (ERROR_NAME_MUST_BE_UNIQUE, "Name must be unique"),
    (ERROR_TOO_MANY_SIGNS, "Too many signs"),
    (ERROR_TEXT_TOO_LONG, "Text is too long"),
    (ERROR_CONNECTION_LOST, "Connection to the server lost"),
    (
        ERROR_ONLY_AVAILABLE_TO_HOST,
        "Only the host can do this",
    ),
    (
        ERROR_GIVE_MONEY_DISABLED,
        "Money transfers are disabled in this game",
    ),
];

/// Generic text for failures without a specific reason.
const GENERIC_FAILURE: &str = "Can't do that";

/// Resolve a string id to display text. Unknown ids (including
/// `INVALID_STRING_ID`) render as the generic failure text.
pub fn resolve(id: StringId) -> &'static str {
    STRING_TABLE
        .iter()
        .find(|(known, _)| *known == id)
        .map_or(GENERIC_FAILURE, |(_, text)| text)
}
