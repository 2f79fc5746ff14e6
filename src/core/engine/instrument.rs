use crate::types::{
    CounterMap, EngineError, InstrumentedArtifact, ProbePoint, SourceUnit, StructuralModel,
};

/// Instrument a source unit against its structural model.
///
/// Counter indices are assigned in source order from the model's unit list,
/// so an identical model always yields an identical `CounterMap`. Probe
/// edits are applied back-to-front by byte offset so earlier offsets stay
/// valid while later text shifts; each edit replaces the exact `old_text`
/// the front end recorded, and a mismatch (stale model, concurrent edit)
/// fails the unit instead of corrupting it.
pub fn instrument(
    unit: &SourceUnit,
    model: &StructuralModel,
) -> Result<(InstrumentedArtifact, CounterMap), EngineError> {
    if model.content_hash != unit.content_hash {
        return Err(EngineError::instrumentation(
            &unit.name,
            "structural model was built from different source text",
        ));
    }
    model.validate()?;

    let map = CounterMap {
        unit_name: model.unit_name.clone(),
        content_hash: model.content_hash,
        entries: model.units.clone(),
    };

    let mut probes: Vec<&ProbePoint> = model.probes.iter().collect();
    probes.sort_by_key(|p| p.byte_offset);

    let mut text = unit.text.clone();
    for probe in probes.iter().rev() {
        let rendered = render_probe(unit, probe, &map)?;
        let start = probe.byte_offset as usize;
        let end = start + probe.old_text.len();
        // byte compare first: a model with an offset inside a multi-byte
        // character must fail the unit, not panic on a slice
        let splice_ok = text.as_bytes().get(start..end) == Some(probe.old_text.as_bytes())
            && text.is_char_boundary(start)
            && text.is_char_boundary(end);
        if !splice_ok {
            return Err(EngineError::instrumentation(
                &unit.name,
                format!(
                    "probe at byte {} expects {:?}, source disagrees",
                    probe.byte_offset, probe.old_text
                ),
            ));
        }
        text.replace_range(start..end, &rendered);
    }

    let artifact = InstrumentedArtifact {
        unit_name: unit.name.clone(),
        content_hash: unit.content_hash,
        text,
    };
    Ok((artifact, map))
}

/// Substitute `{0}`, `{1}`, ... in the probe template with the counter
/// indices assigned to the probe's units, in order
fn render_probe(
    unit: &SourceUnit,
    probe: &ProbePoint,
    map: &CounterMap,
) -> Result<String, EngineError> {
    let mut rendered = probe.template.clone();
    for (slot, countable) in probe.units.iter().enumerate() {
        let index = map.index_of(countable).ok_or_else(|| {
            EngineError::instrumentation(
                &unit.name,
                format!("probe references {countable}, which has no counter index"),
            )
        })?;
        rendered = rendered.replace(&format!("{{{slot}}}"), &index.to_string());
    }
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BranchKind, BranchLabel, CountableUnit, DecisionSite};

    fn tiny_model(unit: &SourceUnit) -> StructuralModel {
        let line = CountableUnit::line(&unit.name, 1);
        let t = CountableUnit::branch(&unit.name, 0, BranchLabel::True, 1);
        let f = CountableUnit::branch(&unit.name, 0, BranchLabel::False, 1);
        StructuralModel {
            unit_name: unit.name.clone(),
            content_hash: unit.content_hash,
            units: vec![line.clone(), t.clone(), f.clone()],
            sites: vec![DecisionSite {
                id: 0,
                kind: BranchKind::If,
                line: 1,
                labels: vec![BranchLabel::True, BranchLabel::False],
            }],
            statements: vec![],
            probes: vec![
                ProbePoint {
                    units: vec![line],
                    byte_offset: 0,
                    old_text: String::new(),
                    template: "__hit({0}); ".to_string(),
                },
                ProbePoint {
                    units: vec![t, f],
                    byte_offset: 4,
                    old_text: "x".to_string(),
                    template: "__cond({0}, {1}, x)".to_string(),
                },
            ],
        }
    }

    #[test]
    fn splices_probes_back_to_front() {
        let unit = SourceUnit::new("t.sim", "if (x) { }");
        let model = tiny_model(&unit);
        let (artifact, map) = instrument(&unit, &model).unwrap();
        assert_eq!(artifact.text, "__hit(0); if (__cond(1, 2, x)) { }");
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn identical_model_reproduces_identical_map() {
        let unit = SourceUnit::new("t.sim", "if (x) { }");
        let (_, a) = instrument(&unit, &tiny_model(&unit)).unwrap();
        let (_, b) = instrument(&unit, &tiny_model(&unit)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn stale_old_text_fails_the_unit() {
        let unit = SourceUnit::new("t.sim", "if (x) { }");
        let mut model = tiny_model(&unit);
        model.probes[1].old_text = "y".to_string();
        let err = instrument(&unit, &model).unwrap_err();
        assert!(err.is_unit_scoped());
    }

    #[test]
    fn offset_inside_a_multibyte_character_fails_the_unit() {
        // 'é' spans bytes 4..6; an offset of 5 is not a char boundary
        let unit = SourceUnit::new("t.sim", "if (é) { }");
        let line = CountableUnit::line(&unit.name, 1);
        let model = StructuralModel {
            unit_name: unit.name.clone(),
            content_hash: unit.content_hash,
            units: vec![line.clone()],
            sites: vec![],
            statements: vec![],
            probes: vec![ProbePoint {
                units: vec![line],
                byte_offset: 5,
                old_text: String::new(),
                template: "__hit({0}); ".to_string(),
            }],
        };
        let err = instrument(&unit, &model).unwrap_err();
        assert!(err.is_unit_scoped());
    }

    #[test]
    fn model_from_other_text_is_rejected() {
        let unit = SourceUnit::new("t.sim", "if (x) { }");
        let model = tiny_model(&unit);
        let edited = SourceUnit::new("t.sim", "if (y) { }");
        assert!(instrument(&edited, &model).is_err());
    }
}
