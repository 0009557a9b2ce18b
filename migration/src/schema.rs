use crate::context::MigrationContext;
use crate::error::MigrationError;
use crate::resolver::EdgeClassResolver;
use crate::sampler::PropertySampler;
use crate::writer::DestinationGraphWriter;
use graphport_core::metrics::Phase;
use graphport_core::model::{
    ClassKind, ConstraintKind, IndexKind, SchemaScope, SourceConstraint, SourceIndex,
};
use source::SourceGraphReader;
use tracing::{debug, info, warn};

/// Replays source constraints, then plain indices, onto the destination
/// schema. Runs after the data pass so property types can be checked against
/// the records already written.
pub struct SchemaMigrator<'a> {
    reader: &'a dyn SourceGraphReader,
    writer: &'a dyn DestinationGraphWriter,
    ctx: &'a mut MigrationContext,
    edge_class_resolver: &'a mut EdgeClassResolver,
}

impl<'a> SchemaMigrator<'a> {
    pub fn new(
        reader: &'a dyn SourceGraphReader,
        writer: &'a dyn DestinationGraphWriter,
        ctx: &'a mut MigrationContext,
        edge_class_resolver: &'a mut EdgeClassResolver,
    ) -> Self {
        Self {
            reader,
            writer,
            ctx,
            edge_class_resolver,
        }
    }

    pub async fn run(mut self) -> Result<(), MigrationError> {
        self.migrate_constraints().await?;
        self.migrate_indices().await
    }

    async fn migrate_constraints(&mut self) -> Result<(), MigrationError> {
        self.ctx.counters.mark_start(Phase::CountConstraints);
        let constraints = self.reader.constraints()?;
        let total = constraints.len() as u64;
        self.ctx.counters.constraints_found += total;
        self.ctx.counters.unique_constraints_found += constraints
            .iter()
            .filter(|c| c.kind == ConstraintKind::Uniqueness)
            .count() as u64;
        self.ctx.counters.mark_stop(Phase::CountConstraints);
        self.ctx.emit(Phase::CountConstraints, total, total);
        info!("Found {} constraints", total);

        self.ctx.counters.mark_start(Phase::Constraints);
        for (i, constraint) in constraints.iter().enumerate() {
            self.migrate_constraint(constraint).await?;
            self.ctx.emit(Phase::Constraints, i as u64 + 1, total);
        }
        self.ctx.counters.mark_stop(Phase::Constraints);
        Ok(())
    }

    async fn migrate_constraint(&mut self, constraint: &SourceConstraint) -> Result<(), MigrationError> {
        let scope_name = constraint.scope.name();
        let Some(key) = constraint.first_key() else {
            warn!("{:?} constraint on {} covers no property, skipped", constraint.kind, scope_name);
            return Ok(());
        };

        let (class_name, kind) = match &constraint.scope {
            SchemaScope::Label(label) => (label.clone(), ClassKind::Vertex),
            SchemaScope::RelationshipType(rel_type) => {
                let decision = self
                    .edge_class_resolver
                    .resolve(rel_type, self.writer)
                    .await;
                (decision.class_name, ClassKind::Edge)
            }
        };

        if !self.ensure_class(&class_name, kind).await {
            return Ok(());
        }
        if !self.ensure_property(&constraint.scope, &class_name, key).await? {
            return Ok(());
        }

        match constraint.kind {
            ConstraintKind::Uniqueness => self.create_unique_index(&class_name, key).await,
            ConstraintKind::NodePropertyExistence | ConstraintKind::RelationshipPropertyExistence => {
                info!(
                    "Existence constraint on {}.{} is not enforced by the destination",
                    class_name, key
                );
                self.ctx.counters.existence_constraints_skipped += 1;
            }
        }
        Ok(())
    }

    async fn create_unique_index(&mut self, class_name: &str, key: &str) {
        // an edge class here means the label collided with a relationship type
        if self.writer.class_kind(class_name).await != Some(ClassKind::Vertex) {
            warn!(
                "Uniqueness constraint on {}.{} skipped: {} is not a vertex class",
                class_name, key, class_name
            );
            return;
        }

        match self.writer.create_index(class_name, key, IndexKind::Unique).await {
            Ok(created) => {
                if created {
                    self.ctx.counters.unique_indices_created += 1;
                }
                self.ctx.counters.constraints_created += 1;
                info!("Unique index on {}.{}", class_name, key);
            }
            Err(err) => {
                warn!(
                    "Unique index on {}.{} failed ({}), falling back to {}",
                    class_name,
                    key,
                    err,
                    IndexKind::NotUnique
                );
                match self.writer.create_index(class_name, key, IndexKind::NotUnique).await {
                    Ok(_) => self.ctx.counters.not_unique_fallbacks += 1,
                    Err(err) => warn!(
                        "Fallback index on {}.{} failed as well: {}",
                        class_name, key, err
                    ),
                }
            }
        }
    }

    async fn migrate_indices(&mut self) -> Result<(), MigrationError> {
        self.ctx.counters.mark_start(Phase::CountIndices);
        let indexes = self.reader.indexes()?;
        let total = indexes.len() as u64;
        self.ctx.counters.indices_found += total;
        self.ctx.counters.mark_stop(Phase::CountIndices);
        self.ctx.emit(Phase::CountIndices, total, total);
        info!("Found {} indices", total);

        self.ctx.counters.mark_start(Phase::Indices);
        for (i, index) in indexes.iter().enumerate() {
            self.migrate_index(index).await?;
            self.ctx.emit(Phase::Indices, i as u64 + 1, total);
        }
        self.ctx.counters.mark_stop(Phase::Indices);
        Ok(())
    }

    async fn migrate_index(&mut self, index: &SourceIndex) -> Result<(), MigrationError> {
        if index.constraint_index {
            debug!("Index on {} backs a constraint, skipped", index.label);
            self.ctx.counters.constraint_indices_skipped += 1;
            return Ok(());
        }
        let Some(key) = index.first_key() else {
            warn!("Index on {} covers no property, skipped", index.label);
            return Ok(());
        };

        if !self.ensure_class(&index.label, ClassKind::Vertex).await {
            return Ok(());
        }
        let scope = SchemaScope::Label(index.label.clone());
        if !self.ensure_property(&scope, &index.label, key).await? {
            return Ok(());
        }

        match self.writer.create_index(&index.label, key, IndexKind::NotUnique).await {
            Ok(true) => {
                self.ctx.counters.indices_created += 1;
                info!("Index on {}.{}", index.label, key);
            }
            Ok(false) => debug!("{}.{} is already indexed", index.label, key),
            Err(err) => warn!("Cannot create index on {}.{}: {}", index.label, key, err),
        }
        Ok(())
    }

    /// Creates an empty class when nothing by that name exists yet.
    async fn ensure_class(&mut self, class_name: &str, kind: ClassKind) -> bool {
        if self.writer.class_exists(class_name).await {
            return true;
        }
        let created = match kind {
            ClassKind::Vertex => self.writer.create_vertex_class(class_name).await,
            ClassKind::Edge => self.writer.create_edge_class(class_name).await,
        };
        match created {
            Ok(()) => {
                match kind {
                    ClassKind::Vertex => self.ctx.counters.vertex_classes_created += 1,
                    ClassKind::Edge => self.ctx.counters.edge_classes_created += 1,
                }
                info!("Created empty {:?} class {}", kind, class_name);
                true
            }
            Err(err) => {
                warn!("Cannot create class {}: {}", class_name, err);
                false
            }
        }
    }

    /// Declares `class_name.key` with the sampled type. `Ok(false)` means the
    /// declaration failed and was logged.
    async fn ensure_property(
        &mut self,
        scope: &SchemaScope,
        class_name: &str,
        key: &str,
    ) -> Result<bool, MigrationError> {
        let sampled = PropertySampler::new(self.reader).sample(scope, key)?;
        if sampled.inferred_default {
            info!(
                "No {} value found for {}, defaulting to {}",
                key,
                scope.name(),
                sampled.dest_type
            );
            self.ctx.counters.inferred_default_types += 1;
        }

        match self
            .writer
            .create_property(class_name, key, sampled.dest_type)
            .await
        {
            Ok(created) => {
                if created {
                    self.ctx.counters.properties_created += 1;
                }
                Ok(true)
            }
            Err(err) => {
                warn!(
                    "Cannot declare {}.{} as {}: {}",
                    class_name, key, sampled.dest_type, err
                );
                Ok(false)
            }
        }
    }
}
