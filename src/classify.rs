use crate::block::MessageBlock;
use crate::standards::{KindDescriptor, MessageKind, MMS_LITERAL, SMS_LITERAL};

/// Keyword classifier. First registry entry (in declaration order) with a keyword found
/// anywhere in the block wins; the SMS/MMS literals are only consulted after that.
pub struct Classifier<'s> {
    kinds: &'s [KindDescriptor],
}

impl<'s> Classifier<'s> {
    pub fn new(kinds: &'s [KindDescriptor]) -> Self {
        Self { kinds }
    }

    pub fn classify(&self, block: &MessageBlock) -> Option<MessageKind> {
        self.classify_text(&block.text)
    }

    pub fn classify_text(&self, text: &str) -> Option<MessageKind> {
        let lowered = text.to_ascii_lowercase();

        for desc in self.kinds {
            if desc.keywords.iter().any(|kw| lowered.contains(kw.as_str())) {
                return Some(desc.id);
            }
        }

        if lowered.contains(SMS_LITERAL) {
            Some(MessageKind::SmsMessage)
        } else if lowered.contains(MMS_LITERAL) {
            Some(MessageKind::MmsMessage)
        } else {
            None
        }
    }
}
