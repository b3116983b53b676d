//! Line history that never stores an API key

use reedline::{
    FileBackedHistory, History, HistoryItem, HistoryItemId, HistorySessionId, SearchQuery,
};

use super::repl;

/// In-memory history which records `/key <KEY>` as a bare `/key`
#[derive(Default)]
pub(crate) struct RedactingHistory {
    inner: FileBackedHistory,
}

fn redact(mut item: HistoryItem) -> HistoryItem {
    if repl::holds_secret(&item.command_line) {
        item.command_line = repl::KEY_COMMAND.to_string();
    }

    item
}

impl History for RedactingHistory {
    fn save(&mut self, h: HistoryItem) -> reedline::Result<HistoryItem> {
        self.inner.save(redact(h))
    }

    fn load(&self, id: HistoryItemId) -> reedline::Result<HistoryItem> {
        self.inner.load(id)
    }

    fn count(&self, query: SearchQuery) -> reedline::Result<i64> {
        self.inner.count(query)
    }

    fn search(&self, query: SearchQuery) -> reedline::Result<Vec<HistoryItem>> {
        self.inner.search(query)
    }

    fn update(
        &mut self,
        id: HistoryItemId,
        updater: &dyn Fn(HistoryItem) -> HistoryItem,
    ) -> reedline::Result<()> {
        self.inner.update(id, &|item| redact(updater(item)))
    }

    fn clear(&mut self) -> reedline::Result<()> {
        self.inner.clear()
    }

    fn delete(&mut self, h: HistoryItemId) -> reedline::Result<()> {
        self.inner.delete(h)
    }

    fn sync(&mut self) -> std::io::Result<()> {
        self.inner.sync()
    }

    fn session(&self) -> Option<HistorySessionId> {
        self.inner.session()
    }
}

#[cfg(test)]
mod tests {
    use reedline::SearchDirection;

    use super::*;

    fn recorded(history: &RedactingHistory) -> Vec<String> {
        history
            .search(SearchQuery::everything(SearchDirection::Forward, None))
            .unwrap()
            .into_iter()
            .map(|item| item.command_line)
            .collect()
    }

    #[test]
    fn test_keys_are_not_recorded() {
        let mut history = RedactingHistory::default();

        history
            .save(HistoryItem::from_command_line("what is rust?"))
            .unwrap();
        history
            .save(HistoryItem::from_command_line("/key sk-or-v1-secret"))
            .unwrap();
        history.save(HistoryItem::from_command_line("/models")).unwrap();
        history
            .save(HistoryItem::from_command_line("  /key   sk-or-v1-other "))
            .unwrap();

        assert_eq!(
            recorded(&history),
            vec!["what is rust?", "/key", "/models", "/key"]
        );
    }
}
