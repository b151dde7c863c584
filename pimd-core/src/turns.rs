use crate::model::{MessageRole, Record, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnKind {
    Message(MessageRole),
    BashExecution,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Text(String),
    Thinking(String),
    Bash { command: String, output: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub kind: TurnKind,
    pub blocks: Vec<Block>,
    pub timestamps: Vec<Timestamp>,
}

impl Turn {
    fn from_record(record: &Record) -> Option<Self> {
        let kind = match record {
            Record::Message(message) => TurnKind::Message(message.role),
            Record::BashExecution(_) => TurnKind::BashExecution,
            Record::Ignored { .. } => return None,
        };

        let mut turn = Self {
            kind,
            blocks: Vec::new(),
            timestamps: Vec::new(),
        };
        turn.absorb(record);
        Some(turn)
    }

    fn absorb(&mut self, record: &Record) {
        match record {
            Record::Message(message) => {
                if !message.text.is_empty() {
                    self.blocks.push(Block::Text(message.text.clone()));
                }
                if let Some(thinking) = &message.thinking {
                    self.blocks.push(Block::Thinking(thinking.clone()));
                }
            }
            Record::BashExecution(bash) => self.blocks.push(Block::Bash {
                command: bash.command.clone(),
                output: bash.output.clone(),
            }),
            Record::Ignored { .. } => return,
        }

        if let Some(timestamp) = record.timestamp() {
            self.timestamps.push(timestamp.clone());
        }
    }

    pub fn role(&self) -> MessageRole {
        match self.kind {
            TurnKind::Message(role) => role,
            TurnKind::BashExecution => MessageRole::System,
        }
    }

    pub fn first_timestamp(&self) -> Option<&Timestamp> {
        self.timestamps.first()
    }

    pub fn last_timestamp(&self) -> Option<&Timestamp> {
        self.timestamps.last()
    }

    fn accepts(&self, record: &Record) -> bool {
        match (self.kind, record) {
            (TurnKind::Message(role), Record::Message(message)) => role == message.role,
            _ => false,
        }
    }
}

pub fn is_renderable(record: &Record, include_bash: bool) -> bool {
    match record {
        Record::Message(message) => message.has_content(),
        Record::BashExecution(_) => include_bash,
        Record::Ignored { .. } => false,
    }
}

/// Builds turns in record order. With `group` set, adjacent message records of
/// the same role share a turn; bash executions always stand alone.
pub fn group_turns(records: &[&Record], group: bool) -> Vec<Turn> {
    let mut turns: Vec<Turn> = Vec::new();

    for record in records {
        if group
            && let Some(current) = turns.last_mut()
            && current.accepts(record)
        {
            current.absorb(record);
            continue;
        }

        if let Some(turn) = Turn::from_record(record) {
            turns.push(turn);
        }
    }

    turns
}

#[cfg(test)]
mod tests {
    use crate::model::{BashExecutionRecord, MessageRecord, MessageRole, Record, Timestamp};
    use crate::turns::{Block, TurnKind, group_turns, is_renderable};

    fn message(role: MessageRole, text: &str, thinking: Option<&str>) -> Record {
        Record::Message(MessageRecord {
            id: None,
            parent_id: None,
            timestamp: Some(Timestamp::Verbatim(text.to_string())),
            role,
            text: text.to_string(),
            thinking: thinking.map(ToString::to_string),
        })
    }

    fn bash(command: &str) -> Record {
        Record::BashExecution(BashExecutionRecord {
            id: None,
            parent_id: None,
            timestamp: None,
            command: command.to_string(),
            output: String::new(),
        })
    }

    #[test]
    fn adjacent_same_role_records_merge() {
        let records = [
            message(MessageRole::User, "u1", None),
            message(MessageRole::Assistant, "a1", Some("t1")),
            message(MessageRole::Assistant, "a2", None),
            message(MessageRole::User, "u2", None),
        ];
        let refs = records.iter().collect::<Vec<_>>();

        let turns = group_turns(&refs, true);
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[1].kind, TurnKind::Message(MessageRole::Assistant));
        assert_eq!(
            turns[1].blocks,
            vec![
                Block::Text("a1".to_string()),
                Block::Thinking("t1".to_string()),
                Block::Text("a2".to_string()),
            ]
        );
        assert_eq!(
            turns[1].first_timestamp(),
            Some(&Timestamp::Verbatim("a1".to_string()))
        );
        assert_eq!(
            turns[1].last_timestamp(),
            Some(&Timestamp::Verbatim("a2".to_string()))
        );
    }

    #[test]
    fn grouping_disabled_keeps_one_turn_per_record() {
        let records = [
            message(MessageRole::User, "u1", None),
            message(MessageRole::User, "u2", None),
        ];
        let refs = records.iter().collect::<Vec<_>>();

        assert_eq!(group_turns(&refs, false).len(), 2);
        assert_eq!(group_turns(&refs, true).len(), 1);
    }

    #[test]
    fn bash_executions_never_merge() {
        let records = [
            message(MessageRole::System, "s1", None),
            bash("ls"),
            bash("pwd"),
            message(MessageRole::System, "s2", None),
        ];
        let refs = records.iter().collect::<Vec<_>>();

        let turns = group_turns(&refs, true);
        assert_eq!(turns.len(), 4);
        assert_eq!(turns[1].kind, TurnKind::BashExecution);
        assert_eq!(turns[1].role(), MessageRole::System);
    }

    #[test]
    fn empty_input_yields_no_turns() {
        assert!(group_turns(&[], true).is_empty());
    }

    #[test]
    fn renderable_filters_empty_messages_and_excluded_bash() {
        assert!(!is_renderable(&message(MessageRole::User, "", None), true));
        assert!(is_renderable(
            &message(MessageRole::Assistant, "", Some("only thinking")),
            false
        ));
        assert!(is_renderable(&bash("ls"), true));
        assert!(!is_renderable(&bash("ls"), false));
    }
}
