//! Deterministic offline provider.
//!
//! Returns a fixed sample component and fixed usage after a simulated delay,
//! so the whole pipeline can run without credentials or network access.

use super::provider::{CompletionProvider, ModelMetadata, ProviderMode};
use super::types::{Completion, Prompt, UsageStats};
use crate::error::InvocationError;
use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const STUB_MODEL_ID: &str = "sprout-stub";
pub const STUB_INPUT_TOKENS: u64 = 450;
pub const STUB_OUTPUT_TOKENS: u64 = 1250;

/// Sample component returned for every prompt.
pub const STUB_COMPONENT: &str = r##"import React, { useState } from 'react';
import { View, Text, StyleSheet, TouchableOpacity, ScrollView, StatusBar } from 'react-native';
import { SafeAreaView } from 'react-native-safe-area-context';
import { LinearGradient } from 'expo-linear-gradient';
import { Ionicons } from '@expo/vector-icons';

export default function GeneratedApp() {
  const [count, setCount] = useState(0);
  const [items, setItems] = useState([
    { id: 1, title: 'Task 1', completed: false },
    { id: 2, title: 'Task 2', completed: false },
    { id: 3, title: 'Task 3', completed: true },
    { id: 4, title: 'Task 4', completed: false },
    { id: 5, title: 'Task 5', completed: true },
  ]);

  const toggleItem = (id) => {
    setItems(items.map(item =>
      item.id === id ? { ...item, completed: !item.completed } : item
    ));
  };

  return (
    <SafeAreaView style={styles.container} edges={['top', 'bottom']}>
      <StatusBar barStyle="light-content" />
      <LinearGradient colors={['#667eea', '#764ba2']} style={styles.gradient}>
        <View style={styles.header}>
          <Text style={styles.headerTitle}>Offline Preview</Text>
          <Text style={styles.headerSubtitle}>Sample App</Text>
        </View>

        <View style={styles.card}>
          <Text style={styles.cardTitle}>Counter</Text>
          <Text style={styles.counterText}>{count}</Text>
          <View style={styles.buttonRow}>
            <TouchableOpacity style={styles.button} onPress={() => setCount(count - 1)}>
              <Ionicons name="remove" size={24} color="#fff" />
            </TouchableOpacity>
            <TouchableOpacity style={styles.button} onPress={() => setCount(count + 1)}>
              <Ionicons name="add" size={24} color="#fff" />
            </TouchableOpacity>
          </View>
        </View>

        <ScrollView style={styles.scrollView}>
          <View style={styles.card}>
            <Text style={styles.cardTitle}>Tasks</Text>
            {items.map(item => (
              <TouchableOpacity key={item.id} style={styles.item} onPress={() => toggleItem(item.id)}>
                <Ionicons
                  name={item.completed ? "checkmark-circle" : "ellipse-outline"}
                  size={24}
                  color={item.completed ? "#4ade80" : "#94a3b8"}
                />
                <Text style={[styles.itemText, item.completed && styles.itemTextCompleted]}>
                  {item.title}
                </Text>
              </TouchableOpacity>
            ))}
          </View>
        </ScrollView>
      </LinearGradient>
    </SafeAreaView>
  );
}

const styles = StyleSheet.create({
  container: { flex: 1, backgroundColor: '#667eea' },
  gradient: { flex: 1, padding: 20 },
  header: { marginBottom: 24 },
  headerTitle: { fontSize: 28, fontWeight: '800', color: '#ffffff', marginBottom: 4 },
  headerSubtitle: { fontSize: 14, color: 'rgba(255, 255, 255, 0.7)' },
  card: { backgroundColor: 'rgba(255, 255, 255, 0.95)', borderRadius: 20, padding: 20, marginBottom: 16 },
  cardTitle: { fontSize: 20, fontWeight: '700', color: '#1e293b', marginBottom: 16 },
  counterText: { fontSize: 64, fontWeight: '900', color: '#667eea', textAlign: 'center', marginVertical: 20 },
  buttonRow: { flexDirection: 'row', justifyContent: 'center', gap: 16 },
  button: { backgroundColor: '#667eea', width: 60, height: 60, borderRadius: 30, alignItems: 'center', justifyContent: 'center' },
  scrollView: { flex: 1 },
  item: { flexDirection: 'row', alignItems: 'center', paddingVertical: 12, borderBottomWidth: 1, borderBottomColor: '#e2e8f0' },
  itemText: { fontSize: 16, color: '#1e293b', marginLeft: 12, flex: 1 },
  itemTextCompleted: { textDecorationLine: 'line-through', color: '#94a3b8' },
});
"##;

/// Offline provider with a fixed answer.
pub struct StubProvider {
    delay: Duration,
}

impl StubProvider {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Stub that answers immediately (tests).
    pub fn instant() -> Self {
        Self::new(Duration::ZERO)
    }
}

#[async_trait]
impl CompletionProvider for StubProvider {
    fn metadata(&self) -> ModelMetadata {
        ModelMetadata {
            id: STUB_MODEL_ID.to_string(),
            mode: ProviderMode::Stub,
        }
    }

    async fn complete(
        &self,
        _prompt: &Prompt,
        cancel: &CancellationToken,
    ) -> Result<Completion, InvocationError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(InvocationError::Cancelled),
            _ = tokio::time::sleep(self.delay) => {}
        }

        Ok(Completion {
            text: STUB_COMPONENT.to_string(),
            usage: UsageStats::new(STUB_INPUT_TOKENS, STUB_OUTPUT_TOKENS, 0, 0),
        })
    }
}
