/// Integration tests for powertools
///
/// Tests are organized into logical groupings:
/// - conversion: query dialect conversion scenarios
/// - workflow: flow parsing, analysis and diagram generation
mod conversion;
mod workflow;
