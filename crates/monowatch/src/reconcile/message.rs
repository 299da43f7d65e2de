//! Human-readable sentences for reconciled events.
//!
//! Details follow a few fixed shapes:
//!
//! | kind                        | detail                              |
//! |-----------------------------|-------------------------------------|
//! | `roll_dice`                 | `3+4=7`                             |
//! | `receive_money`/`pay_money` | `200 (passing GO)`                  |
//! | `buy_property`/`sell_property` | `Baltic Avenue for 60`           |
//! | `pay_rent`                  | `4 to RED for Baltic Avenue`        |
//! | `move_and_buy`/`move_and_pay` | `{move detail} -> {second detail}` |
//!
//! A detail that does not parse falls back to a generic sentence, so every
//! kind always yields a message.

use super::event::ActionKind;

pub const MERGE_SEPARATOR: &str = " -> ";

pub fn describe(player: &str, kind: ActionKind, detail: &str) -> String {
    specific(player, kind, detail).unwrap_or_else(|| fallback(player, kind, detail))
}

fn fallback(player: &str, kind: ActionKind, detail: &str) -> String {
    if detail.is_empty() {
        format!("{} did '{}'.", player, kind)
    } else {
        format!("{} did '{}': {}.", player, kind, detail)
    }
}

fn non_empty(detail: &str) -> Option<&str> {
    (!detail.is_empty()).then_some(detail)
}

/// `"200 (passing GO)"` into amount and optional reason
fn amount_and_reason(detail: &str) -> Option<(&str, Option<&str>)> {
    match detail.split_once(" (") {
        Some((amount, rest)) => Some((amount, rest.strip_suffix(')'))),
        None => non_empty(detail).map(|amount| (amount, None)),
    }
}

/// `"4 to RED for Baltic Avenue"` into rent, owner, square
fn rent_parts(detail: &str) -> Option<(&str, &str, Option<&str>)> {
    let (rent, rest) = detail.split_once(" to ")?;
    Some(match rest.split_once(" for ") {
        Some((owner, square)) => (rent, owner, Some(square)),
        None => (rent, rest, None),
    })
}

fn specific(player: &str, kind: ActionKind, detail: &str) -> Option<String> {
    use ActionKind::*;

    let sentence = match kind {
        JoinGame => format!("{} joined the game.", player),
        LeaveGame => format!("{} left the game.", player),
        ChangeName => format!("{} is now called {}.", player, non_empty(detail)?),
        RollDice => {
            let (_, sum) = detail.split_once('=')?;
            let sum = sum.split_whitespace().next()?;
            format!("{} rolled the dice and moves {} squares.", player, sum)
        }
        Move => format!("{} lands on {}.", player, non_empty(detail)?),
        Goto => format!("{} goes directly to {}.", player, non_empty(detail)?),
        ReceiveMoney => match amount_and_reason(detail)? {
            (amount, Some(reason)) => format!("{} receives ${} for {}.", player, amount, reason),
            (amount, None) => format!("{} receives ${}.", player, amount),
        },
        PayMoney => match amount_and_reason(detail)? {
            (amount, Some(reason)) => format!("{} pays ${} for {}.", player, amount, reason),
            (amount, None) => format!("{} pays ${}.", player, amount),
        },
        BuyProperty => {
            let (square, price) = detail.split_once(" for ")?;
            format!("{} buys {} for ${}.", player, square, price)
        }
        SellProperty => {
            let (square, price) = detail.split_once(" for ")?;
            format!("{} sells {} for ${}.", player, square, price)
        }
        MortgageProperty => format!("{} mortgages {}.", player, non_empty(detail)?),
        UnmortgageProperty => format!("{} lifts the mortgage on {}.", player, non_empty(detail)?),
        BuildHouse => format!("{} builds a house on {}.", player, non_empty(detail)?),
        BuildHotel => format!("{} builds a hotel on {}.", player, non_empty(detail)?),
        PayRent => match rent_parts(detail)? {
            (rent, owner, Some(square)) => {
                format!("{} pays ${} rent to {} for {}.", player, rent, owner, square)
            }
            (rent, owner, None) => format!("{} pays ${} rent to {}.", player, rent, owner),
        },
        JailEnter => format!("{} goes to jail.", player),
        JailExit => match non_empty(detail) {
            Some(how) => format!("{} gets out of jail ({}).", player, how),
            None => format!("{} gets out of jail.", player),
        },
        AuctionStarted => format!("An auction starts for {}.", non_empty(detail)?),
        Bid => format!("{} bids {}.", player, non_empty(detail)?),
        AuctionEnded => format!("The auction is over. {}", non_empty(detail)?),
        PropertyOffer => match offered_square(detail) {
            Some(square) => format!("{} may buy {}.", player, square),
            None => format!("{} may buy a property.", player),
        },
        JailOptions => format!("{} must choose how to leave jail.", player),
        ChanceCard => format!("{} draws a Chance card: {}", player, non_empty(detail)?),
        CommunityChest => {
            format!("{} draws a Community Chest card: {}", player, non_empty(detail)?)
        }
        Message => {
            let text = non_empty(detail)?;
            if text.contains("Passed Go") {
                format!("{} passes GO and collects $200.", player)
            } else {
                format!("Message: {}", text)
            }
        }
        MoveAndBuy => {
            let (_, bought) = detail.split_once(MERGE_SEPARATOR)?;
            let (square, price) = bought.split_once(" for ")?;
            format!("{} lands on {} and buys it for ${}.", player, square, price)
        }
        MoveAndPay => {
            let (landed, paid) = detail.split_once(MERGE_SEPARATOR)?;
            let (rent, owner, square) = rent_parts(paid)?;
            format!(
                "{} lands on {} and pays ${} rent to {}.",
                player,
                square.unwrap_or(landed),
                rent,
                owner
            )
        }
    };
    Some(sentence)
}

/// Square name out of a prompt such as "Do you want to buy Park Place for $350?"
fn offered_square(text: &str) -> Option<&str> {
    let (_, after) = text.split_once("buy ")?;
    let (square, _) = after.split_once(" for")?;
    non_empty(square.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structured_details() {
        assert_eq!(
            describe("BLUE", ActionKind::RollDice, "3+4=7"),
            "BLUE rolled the dice and moves 7 squares."
        );
        assert_eq!(
            describe("BLUE", ActionKind::RollDice, "5+6=11 (no reset seen)"),
            "BLUE rolled the dice and moves 11 squares."
        );
        assert_eq!(
            describe("BLUE", ActionKind::ReceiveMoney, "200 (passing GO)"),
            "BLUE receives $200 for passing GO."
        );
        assert_eq!(
            describe("BLUE", ActionKind::PayRent, "4 to RED for Baltic Avenue"),
            "BLUE pays $4 rent to RED for Baltic Avenue."
        );
        assert_eq!(
            describe("BLUE", ActionKind::MoveAndBuy, "Baltic Avenue -> Baltic Avenue for 60"),
            "BLUE lands on Baltic Avenue and buys it for $60."
        );
        assert_eq!(
            describe("RED", ActionKind::MoveAndPay, "Reading Railroad -> 25 to BLUE"),
            "RED lands on Reading Railroad and pays $25 rent to BLUE."
        );
    }

    #[test]
    fn test_every_kind_has_a_message() {
        use strum::IntoEnumIterator;
        for kind in ActionKind::iter() {
            assert!(!describe("BLUE", kind, "").is_empty());
            assert!(!describe("BLUE", kind, "garbage").is_empty());
        }
    }

    #[test]
    fn test_unparsable_detail_falls_back() {
        assert_eq!(
            describe("BLUE", ActionKind::BuyProperty, "something"),
            "BLUE did 'buy_property': something."
        );
    }

    #[test]
    fn test_property_offer() {
        assert_eq!(
            describe(
                "System",
                ActionKind::PropertyOffer,
                "Do you want to buy Park Place for $350?"
            ),
            "System may buy Park Place."
        );
    }
}
