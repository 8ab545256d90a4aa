//! Standard algebraic notation, built from spoken skeletons and read back
//! out loud

use shakmaty::Role;

use crate::voice::{CastleSide, MoveSkeleton};

pub fn role_letter(role: Role) -> Option<char> {
    match role {
        Role::Pawn => None,
        Role::Knight => Some('N'),
        Role::Bishop => Some('B'),
        Role::Rook => Some('R'),
        Role::Queen => Some('Q'),
        Role::King => Some('K'),
    }
}

pub fn role_name(role: Role) -> &'static str {
    match role {
        Role::Pawn => "pawn",
        Role::Knight => "knight",
        Role::Bishop => "bishop",
        Role::Rook => "rook",
        Role::Queen => "queen",
        Role::King => "king",
    }
}

fn role_from_letter(letter: char) -> Option<Role> {
    match letter {
        'N' => Some(Role::Knight),
        'B' => Some(Role::Bishop),
        'R' => Some(Role::Rook),
        'Q' => Some(Role::Queen),
        'K' => Some(Role::King),
        _ => None,
    }
}

pub fn castle_san(side: CastleSide) -> &'static str {
    match side {
        CastleSide::Kingside => "O-O",
        CastleSide::Queenside => "O-O-O",
    }
}

/// Piece letter, disambiguating file and rank, `x` for a capture, target
/// square and `=` plus the promotion letter. Pure: no board involved.
pub fn assemble(skeleton: &MoveSkeleton) -> String {
    let mut san = String::with_capacity(8);
    if let Some(letter) = role_letter(skeleton.piece) {
        san.push(letter);
    }
    if let Some(file) = skeleton.from_file {
        san.push(file.char());
    }
    if let Some(rank) = skeleton.from_rank {
        san.push(rank.char());
    }
    if skeleton.capture {
        san.push('x');
    }
    san.push_str(&skeleton.target.to_string());
    if let Some(letter) = skeleton.promotion.and_then(role_letter) {
        san.push('=');
        san.push(letter);
    }
    san
}

/// Reads SAN back as a phrase the voice parser understands, e.g.
/// `exd5` becomes "pawn from e takes d5" and `Nf3+` "knight to f3, check".
pub fn spoken(san: &str) -> Option<String> {
    let (body, suffix) = match san.trim().strip_suffix('#') {
        Some(body) => (body, Some("checkmate")),
        None => match san.trim().strip_suffix('+') {
            Some(body) => (body, Some("check")),
            None => (san.trim(), None),
        },
    };

    let mut phrase = match body {
        "O-O" | "0-0" => "castle kingside".to_string(),
        "O-O-O" | "0-0-0" => "castle queenside".to_string(),
        _ => spoken_move(body)?,
    };
    if let Some(suffix) = suffix {
        phrase.push_str(", ");
        phrase.push_str(suffix);
    }
    Some(phrase)
}

fn spoken_move(body: &str) -> Option<String> {
    let (body, promotion) = match body.split_once('=') {
        Some((body, letter)) => {
            let mut chars = letter.chars();
            match (chars.next().and_then(role_from_letter), chars.next()) {
                (Some(role), None) => (body, Some(role)),
                _ => return None,
            }
        }
        None => (body, None),
    };

    let mut chars: Vec<char> = body.chars().collect();
    let role = match chars.first().copied().and_then(role_from_letter) {
        Some(role) => {
            chars.remove(0);
            role
        }
        None => Role::Pawn,
    };

    if chars.len() < 2 {
        return None;
    }
    let target: String = chars.split_off(chars.len() - 2).into_iter().collect();
    let capture = chars.last() == Some(&'x');
    if capture {
        chars.pop();
    }
    if chars.len() > 2 || !target.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }

    let mut phrase = role_name(role).to_string();
    if !chars.is_empty() {
        phrase.push_str(" from ");
        phrase.extend(chars);
    }
    phrase.push_str(if capture { " takes " } else { " to " });
    phrase.push_str(&target);
    if let Some(role) = promotion {
        phrase.push_str(" promote to ");
        phrase.push_str(role_name(role));
    }
    Some(phrase)
}
