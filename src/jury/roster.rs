//! 陪审团名单：内置房间 A / B / C，可由配置 [rooms.<NAME>] 覆盖或补充

use crate::config::{AppConfig, RosterEntry};
use crate::core::JuryError;
use crate::jury::AgentState;

/// 名单至少需要的陪审员数（否则无人可「换人发言」）
pub const MIN_JURORS: usize = 2;

const ROOM_A: &[(&str, &str)] = &[
    ("Aristotle", "The ancient Greek philosopher Aristotle"),
    (
        "Homer Simpson",
        "The funny but slightly dumb cartoon character Homer Simpson",
    ),
    ("Agatha Christie", "The detective story author Agatha Christie"),
    ("Nikola Tesla", "The mad scientist polymath Nikola Tesla"),
    (
        "Dana Scully",
        "The intelligent, resourceful, and skeptical FBI agent Dana Scully",
    ),
    (
        "Liutentant Worf",
        "The Klingon Lieutenant Worf from Star Trek TNG",
    ),
];

const ROOM_B: &[(&str, &str)] = &[
    ("Yoda", "The wise and powerful Jedi master Yoda"),
    ("Albert Einstein", "The genius physicist Albert Einstein"),
    (
        "Napoleon Bonaparte",
        "The ambitious French military leader Napoleon Bonaparte",
    ),
    (
        "Count Dracula",
        "The bloodthirsty Romanian vampire Count Dracula",
    ),
    (
        "Mother Teresa",
        "The compassionate and selfless nun Mother Teresa",
    ),
    (
        "Mikhail Bakunin",
        "The Russian revolutionary anarchist Mikhail Bakunin",
    ),
];

const ROOM_C: &[(&str, &str)] = &[
    ("Al Capone", "The ruthless and notorious gangster Al Capone"),
    ("The Log Lady", "The mysterious Log Lady from Twin Peaks"),
    ("MacGyver", "The resourceful and ingenious agent MacGyver"),
    (
        "Confucius",
        "The wise and influential Chinese philosopher Confucius",
    ),
    (
        "Marie Curie",
        "The pioneering and brilliant scientist Marie Curie",
    ),
    (
        "The Terminator",
        "The Terminator cyborg played by Arnod Schwarzenegger",
    ),
];

/// 房间名不区分大小写；规范形式为去空白后的大写，存储与日志都用它
pub fn canonical_room(room: &str) -> String {
    room.trim().to_ascii_uppercase()
}

/// 规范化并去重（保留首次出现的顺序）；同一房间只能有一个编排器
pub fn unique_rooms<S: AsRef<str>>(rooms: &[S]) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(rooms.len());
    for room in rooms {
        let room = canonical_room(room.as_ref());
        if !unique.contains(&room) {
            unique.push(room);
        }
    }
    unique
}

/// 内置名单
pub fn builtin_roster(room: &str) -> Option<Vec<RosterEntry>> {
    let entries = match canonical_room(room).as_str() {
        "A" => ROOM_A,
        "B" => ROOM_B,
        "C" => ROOM_C,
        _ => return None,
    };
    Some(
        entries
            .iter()
            .map(|(name, description)| RosterEntry {
                name: name.to_string(),
                description: description.to_string(),
            })
            .collect(),
    )
}

/// 解析房间名单：配置优先，其次内置；校验人数与重名
pub fn resolve_roster(room: &str, config: &AppConfig) -> Result<Vec<RosterEntry>, JuryError> {
    let entries = match config.room(&canonical_room(room)) {
        Some(entries) => entries.to_vec(),
        None => builtin_roster(room).ok_or_else(|| JuryError::UnknownRoom(room.to_string()))?,
    };

    if entries.len() < MIN_JURORS {
        return Err(JuryError::InvalidRoster {
            room: room.to_string(),
            reason: format!("needs at least {} jurors, got {}", MIN_JURORS, entries.len()),
        });
    }
    for (i, entry) in entries.iter().enumerate() {
        if entry.name.trim().is_empty() {
            return Err(JuryError::InvalidRoster {
                room: room.to_string(),
                reason: "juror name is empty".to_string(),
            });
        }
        if entries[..i].iter().any(|e| e.name == entry.name) {
            return Err(JuryError::InvalidRoster {
                room: room.to_string(),
                reason: format!("duplicate juror {}", entry.name),
            });
        }
    }
    Ok(entries)
}

/// 按名单生成初始陪审员状态
pub fn fresh_jurors(roster: &[RosterEntry]) -> Vec<AgentState> {
    roster
        .iter()
        .map(|e| AgentState::new(e.name.clone(), e.description.clone()))
        .collect()
}
