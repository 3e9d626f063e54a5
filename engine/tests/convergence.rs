//! Property tests: sites editing concurrently all converge on the record.
//!
//! Each simulated site keeps a local copy of the text, edits it freely and
//! syncs now and then. On sync it submits its pending operations and rebases
//! them over whatever other sites committed in the meantime.

use proptest::prelude::*;
use quire_engine::{
    reconcile, updates_since, DocumentRecord, Operation, TextOperation, INITIAL_CONTENT,
};

struct Site {
    id: String,
    content: String,
    /// Last execution order integrated
    known: u64,
    next_seq: u64,
    pending: Vec<Operation>,
    last_batch: Vec<Operation>,
}

impl Site {
    fn new(id: &str, record: &DocumentRecord) -> Self {
        Self {
            id: id.to_string(),
            content: record.content().to_string(),
            known: record.execution_order(),
            next_seq: 1,
            pending: Vec::new(),
            last_batch: Vec::new(),
        }
    }

    fn edit(&mut self, action: &Action) {
        let len = self.content.chars().count();
        let edit = match action {
            Action::Insert { pos, text, .. } => {
                TextOperation::insert_at(len, pos % (len + 1), text).unwrap()
            }
            Action::Delete { pos, count, .. } if len > 0 => {
                let pos = pos % len;
                TextOperation::delete_at(len, pos, (*count).min(len - pos)).unwrap()
            }
            _ => return,
        };
        self.content = edit.apply(&self.content).unwrap();
        self.pending
            .push(Operation::new(self.id.clone(), self.next_seq, self.known, edit));
        self.next_seq += 1;
    }

    fn sync(&mut self, record: &mut DocumentRecord) {
        let batch = std::mem::take(&mut self.pending);
        let outcome = reconcile(record, batch.clone()).unwrap();
        assert_eq!(outcome.applied(), batch.len());

        let mut pending = batch.clone();
        for update in updates_since(record, self.known as i64) {
            if update.site == self.id {
                let acked = pending.remove(0);
                assert_eq!(acked.seq, update.seq);
            } else {
                let mut incoming = update.applied.clone().unwrap();
                for local in pending.iter_mut() {
                    let (incoming_prime, local_prime) =
                        TextOperation::transform(&incoming, &local.edit).unwrap();
                    incoming = incoming_prime;
                    local.edit = local_prime;
                }
                self.content = incoming.apply(&self.content).unwrap();
            }
            self.known = update.exec_order.unwrap();
        }
        assert!(pending.is_empty());
        self.last_batch = batch;
    }

    /// Resend the last batch, as after a lost response.
    fn retry(&mut self, record: &mut DocumentRecord) {
        let before = record.clone();
        let outcome = reconcile(record, self.last_batch.clone()).unwrap();
        assert_eq!(outcome.applied(), 0);
        assert_eq!(outcome.duplicates, self.last_batch.len());
        assert_eq!(*record, before);
    }
}

#[derive(Debug, Clone)]
enum Action {
    Insert { site: usize, pos: usize, text: String },
    Delete { site: usize, pos: usize, count: usize },
    Sync { site: usize },
    Retry { site: usize },
}

fn arb_action() -> impl Strategy<Value = Action> {
    prop_oneof![
        (0usize..3, 0usize..40, "[a-z ]{1,4}")
            .prop_map(|(site, pos, text)| Action::Insert { site, pos, text }),
        (0usize..3, 0usize..40, 1usize..4)
            .prop_map(|(site, pos, count)| Action::Delete { site, pos, count }),
        (0usize..3).prop_map(|site| Action::Sync { site }),
        (0usize..3).prop_map(|site| Action::Retry { site }),
    ]
}

proptest! {
    #[test]
    fn prop_sites_converge(actions in prop::collection::vec(arb_action(), 0..40)) {
        let mut record = DocumentRecord::new("doc");
        let mut sites: Vec<Site> = ["a", "b", "c"]
            .iter()
            .map(|id| Site::new(id, &record))
            .collect();

        for action in &actions {
            match action {
                Action::Insert { site, .. } | Action::Delete { site, .. } => {
                    sites[*site].edit(action)
                }
                Action::Sync { site } => sites[*site].sync(&mut record),
                Action::Retry { site } => sites[*site].retry(&mut record),
            }
            prop_assert!(record.verify(INITIAL_CONTENT).is_ok());
        }

        for _ in 0..2 {
            for site in sites.iter_mut() {
                site.sync(&mut record);
            }
        }

        for site in &sites {
            prop_assert_eq!(&site.content, record.content());
        }
        prop_assert!(record.verify(INITIAL_CONTENT).is_ok());
    }

    #[test]
    fn prop_updates_since_is_a_suffix(inserts in 0u64..12, since in -3i64..16) {
        let mut record = DocumentRecord::new("doc");
        let batch = (1..=inserts).map(|seq| {
            let len = 11 + seq as usize - 1;
            Operation::new("a", seq, 0, TextOperation::insert_at(len, len, "x").unwrap())
        });
        reconcile(&mut record, batch).unwrap();

        let orders: Vec<u64> = updates_since(&record, since)
            .iter()
            .filter_map(|op| op.exec_order)
            .collect();
        let expected: Vec<u64> = (1..=inserts).filter(|order| *order as i64 > since).collect();
        prop_assert_eq!(orders, expected);
        prop_assert_eq!(record.execution_order(), inserts);
    }
}
