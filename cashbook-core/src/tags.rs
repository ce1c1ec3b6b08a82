use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::config::Config;
use crate::journal::Journal;
use crate::reference;

/// One entry's appearance in a tag group, flattened for the export.
#[derive(Clone, Debug)]
pub struct TagRow {
    pub reference: String,
    pub valuta: String,
    pub amount: Decimal,
    pub debit: u32,
    pub credit: u32,
    pub template: String,
    pub comment: String,
    pub all_tags: String,
    pub bank_description: String,
}

/// All entries carrying a tag, with the per-tag sum.
#[derive(Clone, Debug)]
pub struct TagGroup {
    pub tag: String,
    pub rows: Vec<TagRow>,
    pub sum: Decimal,
}

/// Groups all tagged entries by tag, sorted by tag name; rows are in
/// reference order.
pub fn tag_groups(journal: &Journal, config: &Config) -> Vec<TagGroup> {
    let mut groups: BTreeMap<String, TagGroup> = BTreeMap::new();
    for entry in journal.entries() {
        for tag in &entry.tags {
            let group = groups.entry(tag.clone()).or_insert_with(|| TagGroup {
                tag: tag.clone(),
                rows: Vec::new(),
                sum: Decimal::ZERO,
            });
            group.sum += entry.amount;
            group.rows.push(TagRow {
                reference: entry.reference.clone(),
                valuta: config.period.format(entry.valuta),
                amount: entry.amount,
                debit: entry.debit,
                credit: entry.credit,
                template: config.template(entry.template).name.clone(),
                comment: entry.comment.clone(),
                all_tags: entry.tags.join("-"),
                bank_description: entry
                    .bank_origin
                    .as_ref()
                    .map(|origin| origin.description.clone())
                    .unwrap_or_default(),
            });
        }
    }
    let mut groups: Vec<TagGroup> = groups.into_values().collect();
    for group in &mut groups {
        group
            .rows
            .sort_by(|a, b| reference::compare(&a.reference, &b.reference));
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Verb;
    use crate::entry::Entry;
    use crate::journal::Journal;
    use crate::testing;
    use rust_decimal_macros::dec;

    #[test]
    fn entries_group_by_tag_with_sums() {
        let config = testing::base_builder().tag("FAHRZEUG").build().unwrap();
        let mut journal = Journal::new(&config);
        for (reference, amount) in [("2017-01-04a", dec!(10.00)), ("2017-02-01a", dec!(20.00))] {
            let valuta = config.period.parse_valuta(&reference[..10]).unwrap();
            let entry = Entry::from_instruction(
                &config,
                Verb::Booking,
                reference.to_string(),
                valuta,
                amount,
                "verbrauch-FAHRZEUG",
                String::new(),
                format!("{} b {:.2} verbrauch-FAHRZEUG", reference, amount),
            );
            journal.add_entry(&config, entry).unwrap();
        }

        let groups = tag_groups(&journal, &config);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].tag, "FAHRZEUG");
        assert_eq!(groups[0].rows.len(), 2);
        assert_eq!(groups[0].sum, dec!(30.00));
        assert_eq!(groups[0].rows[0].reference, "2017-01-04a");
        assert_eq!(groups[0].rows[0].template, "verbrauch");
    }

    #[test]
    fn untagged_entries_do_not_appear() {
        let config = testing::config();
        let mut journal = Journal::new(&config);
        journal
            .add_entry(
                &config,
                testing::entry(&config, "2017-01-04a", dec!(10.00), "einnahmen"),
            )
            .unwrap();
        assert!(tag_groups(&journal, &config).is_empty());
    }
}
