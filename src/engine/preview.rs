use crate::{
    Error,
    database_id::RuleId,
    engine::{PreviewResult, RuleEngine, evaluate_rule},
    stores::{Ledger, RuleStore},
    transaction::DateRange,
};

impl<L: Ledger> RuleEngine<L> {
    /// Report which transactions the rule `rule_id` would recategorize,
    /// without writing anything.
    ///
    /// Transactions that already hold the rule's category are reported with
    /// `no_op` set. Inactive rules can be previewed.
    ///
    /// # Errors
    ///
    /// Returns [Error::RuleNotFound] if `rule_id` does not refer to a rule,
    /// [Error::InvalidCondition] if the stored condition is malformed, or a
    /// store error.
    pub fn preview(
        &self,
        rule_id: RuleId,
        date_range: Option<DateRange>,
    ) -> Result<PreviewResult, Error> {
        let start_time = std::time::Instant::now();

        let preview = self.ledger.atomically(|scope| {
            let rule = scope.get_rule(rule_id)?;
            let entries = evaluate_rule(scope, &rule, date_range)?;
            let would_change_count = entries.iter().filter(|entry| !entry.no_op).count();

            Ok(PreviewResult {
                rule_id,
                category: rule.category,
                date_range,
                matched_count: entries.len(),
                would_change_count,
                entries,
            })
        })?;

        tracing::info!(
            "Previewed rule {rule_id} in {}ms: {} transactions matched, {} would change",
            start_time.elapsed().as_millis(),
            preview.matched_count,
            preview.would_change_count
        );

        Ok(preview)
    }
}
