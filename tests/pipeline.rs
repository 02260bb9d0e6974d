use cdc_intercept::model::{SmsChannel, SmsDirection};
use cdc_intercept::{
    correlate, parse, parse_with, preferred_call, CallDirection, CallStatus, CallType, MessageKind, Standards,
    GLOBAL_EVENTS_KEY,
};

const SAMPLE: &str = include_str!("fixtures/sample_intercept.log");

#[test]
fn test_sample_log_builds_one_call() {
    let out = parse_with(SAMPLE, &Standards::default());

    let kinds: Vec<Option<MessageKind>> = out.messages.iter().map(|m| m.kind).collect();
    assert_eq!(
        kinds,
        vec![
            None,
            Some(MessageKind::TermAttempt),
            Some(MessageKind::DirectSignalReporting),
            Some(MessageKind::DirectSignalReporting),
            Some(MessageKind::SmsMessage),
        ]
    );

    let identified: Vec<_> = out.calls.identified().collect();
    assert_eq!(identified.len(), 1);
    let call = identified[0];

    assert_eq!(call.key, "003a1486d04f061e");
    assert_eq!(call.call_id.as_deref(), Some("003A1486D04F061E"));
    assert_eq!(call.case_id.as_deref(), Some("CASE-2025-001"));
    assert_eq!(call.call_type, Some(CallType::SmsMms));
    assert_eq!(call.call_direction, Some(CallDirection::Incoming));
    assert_eq!(call.caller_name.as_deref(), Some("JOHN DOE"));
    assert_eq!(call.calling_number(), Some("+16313841232"));
    assert_eq!(call.called_number(), Some("+16313754560"));
    assert_eq!(call.call_status, Some(CallStatus::Initiated));
    assert_eq!(call.duration, None);

    let device = call.device.as_ref().expect("device from User-Agent");
    assert_eq!(device.vendor.as_deref(), Some("Apple"));
    assert_eq!(device.model.as_deref(), Some("iPhone15,2"));

    assert_eq!(call.sip_messages.len(), 2);
    assert_eq!(call.sip_messages[0].method.as_deref(), Some("INVITE"));
    assert_eq!(call.sip_messages[1].status_code, Some(180));
    assert_eq!(call.signaling_log().count(), 2);

    assert_eq!(call.sms.len(), 1);
    assert_eq!(call.sms[0].content.as_deref(), Some("See you there at 5pm."));
    assert_eq!(call.sms[0].from.as_deref(), Some("+16313841232"));
    assert_eq!(call.sms[0].to.as_deref(), Some("+16313754560"));

    assert_eq!(call.codecs.len(), 2);
    assert_eq!(call.locations.len(), 1);
    let cell = call.locations[0].cell.as_ref().unwrap();
    assert_eq!(cell.tower_key().as_deref(), Some("1360-1095627788"));

    assert_eq!(preferred_call(&out.calls).map(|c| c.key.as_str()), Some("003a1486d04f061e"));
}

#[test]
fn test_sample_log_serializes_with_wire_names() {
    let out = parse_with(SAMPLE, &Standards::default());
    let call = out.calls.get("003a1486d04f061e").unwrap();
    let json = serde_json::to_value(call).unwrap();
    assert_eq!(json["callType"], "SMS/MMS");
    assert_eq!(json["callDirection"], "Incoming");
    assert_eq!(json["messages"][0]["type"], "termAttempt");
    assert_eq!(json["messages"][0]["payload"]["variant"], "attempt");
}

#[test]
fn test_parsing_is_deterministic() {
    let table = Standards::default();
    let a = serde_json::to_string(&parse_with(SAMPLE, &table).calls).unwrap();
    let b = serde_json::to_string(&parse_with(SAMPLE, &table).calls).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_every_message_lands_in_one_bucket() {
    let out = parse_with(SAMPLE, &Standards::default());
    let bucketed: usize = out.calls.iter().map(|c| c.messages.len()).sum();
    assert_eq!(bucketed, out.messages.len());

    for msg in &out.messages {
        let key = msg
            .call_id
            .as_deref()
            .map(|id| id.trim().to_lowercase())
            .unwrap_or_else(|| GLOBAL_EVENTS_KEY.to_string());
        assert!(out.calls.get(&key).unwrap().messages.contains(msg));
    }
}

const TWO_CALLS: &str = "\
termAttempt
  timestamp = 2025-01-15T10:00:00Z
  callId = CALL-A
  calling
    uri[0] = tel:+15559990000
  called
    uri[0] = tel:+15551230000
answer
  timestamp = 2025-01-15T10:00:10Z
  callId = call-a
release
  timestamp = 2025-01-15T10:02:39.600Z
  callId = Call-A
  cause
    signalingType = normalClearing
origAttempt
  timestamp = 2025-01-15T10:02:54.600Z
  callId = CALL-B
  calling
    uri[0] = sip:+15551230000@ims.example.com
  called
    uri[0] = tel:+15557770000
";

#[test]
fn test_duration_and_case_insensitive_merge() {
    let out = parse_with(TWO_CALLS, &Standards::default());
    assert_eq!(out.calls.keys().collect::<Vec<_>>(), vec!["call-a", "call-b"]);

    let a = out.calls.get("call-a").unwrap();
    assert_eq!(a.messages.len(), 3);
    assert_eq!(a.duration, Some(150));
    assert_eq!(a.call_status, Some(CallStatus::Answered));
    assert_eq!(a.release_cause.as_deref(), Some("normalClearing"));

    let b = out.calls.get("call-b").unwrap();
    assert_eq!(b.call_direction, Some(CallDirection::Outgoing));
    assert_eq!(b.duration, None);
}

#[test]
fn test_forwarding_between_calls() {
    let out = parse_with(TWO_CALLS, &Standards::default());
    let result = correlate(&out.calls);

    assert_eq!(result.forwarding_sequences.len(), 1);
    let fwd = &result.forwarding_sequences[0];
    assert_eq!((fwd.call_a.as_str(), fwd.call_b.as_str()), ("call-a", "call-b"));
    assert_eq!(fwd.forwarding_number, "15551230000");
    assert_eq!(fwd.gap_seconds, 15);
    assert!(result.time_overlaps.is_empty());
    assert_eq!(result.shared_contacts.len(), 1);
}

#[test]
fn test_dialect_file_extends_registry() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dialect.toml");
    std::fs::write(
        &path,
        r#"
        [[kinds]]
        id = "answer"
        keywords = ["callconnected"]

        [aliases]
        callId = ["cin"]
        "#,
    )
    .unwrap();

    let log = "CallConnected\n  cin = X-9\n  timestamp = 2025-01-15T10:00:00Z\n";
    let before = parse_with(log, &Standards::default());
    assert_eq!(before.messages[0].kind, None);

    let mut table = Standards::default();
    table.merge(Standards::load(&path).unwrap());
    let after = parse(log, &table.kinds, &table.aliases);
    assert_eq!(after.messages[0].kind, Some(MessageKind::Answer));
    let call = after.calls.get("x-9").unwrap();
    assert_eq!(call.call_status, Some(CallStatus::Answered));
    assert_eq!(call.answer_time.as_deref(), Some("2025-01-15T10:00:00Z"));
}

#[test]
fn test_unanswered_release_ends_call() {
    let log = "\
termAttempt
  timestamp = 2025-01-15T12:00:00Z
  callId = NA-1
release
  timestamp = 2025-01-15T12:00:30Z
  callId = NA-1
  cause
    signalingType = 480 / noAnswer
";
    let out = parse_with(log, &Standards::default());
    assert_eq!(out.messages[1].kind, Some(MessageKind::Release));

    let call = out.calls.get("na-1").unwrap();
    assert_eq!(call.call_status, Some(CallStatus::Ended));
    assert_eq!(call.end_time.as_deref(), Some("2025-01-15T12:00:30Z"));
    assert_eq!(call.release_cause.as_deref(), Some("480 / noAnswer"));
    assert!(call.answer_time.is_none());
}

#[test]
fn test_sip_message_becomes_sms_entry() {
    let log = "\
directSignalReporting
  timestamp = 2025-01-15T11:00:00Z
  callId = SMS-1
  sigMsg = MESSAGE tel:+16313754560 SIP/2.0
  From: <sip:+16313841232@ims.example.com>;tag=9
  To: <tel:+16313754560>
  P-Called-Party-ID: <tel:+16313754560>
  Call-ID: m1@ims.example.com
  Content-Type: application/vnd.3gpp.sms

  Meet at the north entrance
";
    let out = parse_with(log, &Standards::default());
    let call = out.calls.get("sms-1").unwrap();

    assert_eq!(call.sip_messages.len(), 1);
    assert!(call.sip_messages[0].sms_over_sip);
    assert_eq!(call.signaling_log().count(), 0);
    assert_eq!(call.call_type, Some(CallType::SmsMms));

    assert_eq!(call.sms.len(), 1);
    let sms = &call.sms[0];
    assert_eq!(sms.direction, SmsDirection::Received);
    assert_eq!(sms.channel, SmsChannel::SipMessage);
    assert_eq!(sms.from.as_deref(), Some("+16313841232"));
    assert_eq!(sms.to.as_deref(), Some("+16313754560"));
    assert_eq!(sms.content.as_deref(), Some("Meet at the north entrance"));
    assert_eq!(sms.timestamp.as_deref(), Some("2025-01-15T11:00:00Z"));
}
